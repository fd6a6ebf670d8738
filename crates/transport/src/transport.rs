//! The reconnecting transport: one receive loop, one heartbeat loop

use futures_util::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::{ReconnectPolicy, TransportConfig};
use crate::connection::{Connection, Connector, Frame, FrameReader};
use crate::diagnostics::{ConnectionState, Counters, Diagnostics, TransportStats};
use crate::error::TransportError;
use crate::handler::StreamHandler;
use crate::sender::{SendStatus, Shared, TransportSender};

/// One logical streaming connection that survives socket failures
///
/// ```text
/// Idle ─start─► Connecting ─► Connected ─error/close─► Disconnected ─► Connecting ─► …
///                    ▲                                                     │
///                    └──────────────── reconnect policy delay ◄────────────┘
/// any state ─stop─► Stopped
/// ```
///
/// `start` and `stop` require a tokio runtime.
pub struct StreamingTransport {
    connector: Arc<dyn Connector>,
    handler: Arc<dyn StreamHandler>,
    config: TransportConfig,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl StreamingTransport {
    pub fn new(
        name: impl Into<String>,
        connector: impl Connector + 'static,
        handler: Arc<dyn StreamHandler>,
        config: TransportConfig,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            handler,
            config,
            shared: Arc::new(Shared::new(name.into())),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the receive and heartbeat loops. A second call while running
    /// is a no-op; after `stop` it fails with `TransportError::Shutdown`.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut workers = self.workers.lock();
        if self.shared.is_stopped() {
            return Err(TransportError::Shutdown);
        }
        if !workers.is_empty() {
            return Ok(());
        }

        info!(
            transport = %self.shared.name,
            endpoint = %self.connector.endpoint(),
            "Starting transport"
        );
        workers.push(tokio::spawn(receive_loop(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            Arc::clone(&self.handler),
            self.config.reconnect,
        )));
        workers.push(tokio::spawn(heartbeat_loop(
            Arc::clone(&self.shared),
            self.config.heartbeat_interval,
        )));
        Ok(())
    }

    /// Signal both loops, close the connection and wait for the loops to
    /// exit. Idempotent. From inside a handler use [`TransportSender::shutdown`].
    pub async fn stop(&self) {
        let previous = self.shared.request_stop();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                if e.is_panic() {
                    error!(transport = %self.shared.name, "Transport worker panicked");
                }
            }
        }
        self.shared.close_writer().await;
        if previous != ConnectionState::Stopped {
            info!(transport = %self.shared.name, "Transport stopped");
        }
    }

    pub fn sender(&self) -> TransportSender {
        TransportSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub async fn send(&self, frame: Frame) -> Result<SendStatus, TransportError> {
        self.sender().send(frame).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<SendStatus, TransportError> {
        self.sender().send_text(text).await
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Receiver that observes every state transition
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.counters.snapshot()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics()
    }
}

impl Drop for StreamingTransport {
    fn drop(&mut self) {
        // Loops observe the state and exit on their own
        self.shared.request_stop();
    }
}

enum Exit {
    Stopped,
    Reconnect(Option<TransportError>),
}

async fn receive_loop(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn StreamHandler>,
    policy: ReconnectPolicy,
) {
    let sender = TransportSender {
        shared: Arc::clone(&shared),
    };
    let mut backoff = policy.backoff();

    while !shared.is_stopped() {
        shared.set_state(ConnectionState::Connecting);
        Counters::bump(&shared.counters.connect_attempts);

        let connected = tokio::select! {
            _ = shared.stopped() => break,
            result = connector.connect() => result,
        };

        match connected {
            Ok(Connection { writer, reader }) => {
                *shared.writer.lock().await = Some(writer);
                shared.set_state(ConnectionState::Connected);
                Counters::bump(&shared.counters.connects);
                backoff.reset();
                info!(transport = %shared.name, endpoint = %connector.endpoint(), "Connected");

                if AssertUnwindSafe(handler.on_connected(&sender))
                    .catch_unwind()
                    .await
                    .is_err()
                {
                    error!(transport = %shared.name, "on_connected panicked");
                }

                let exit = read_frames(&shared, &sender, handler.as_ref(), reader).await;

                shared.close_writer().await;
                shared.set_state(ConnectionState::Disconnected);
                handler.on_disconnected().await;

                match exit {
                    Exit::Stopped => break,
                    Exit::Reconnect(Some(err)) => {
                        warn!(transport = %shared.name, error = %err, "Connection lost, reconnecting");
                        handler.on_error(&err, &shared.diagnostics());
                    }
                    Exit::Reconnect(None) => {
                        warn!(transport = %shared.name, "Send path failed, reconnecting");
                    }
                }
            }
            Err(err) => {
                warn!(
                    transport = %shared.name,
                    attempt = shared.counters.snapshot().connect_attempts,
                    error = %err,
                    "Connect failed"
                );
                handler.on_error(&err, &shared.diagnostics());
            }
        }

        let delay = backoff.next_delay();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            debug!(transport = %shared.name, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                _ = shared.stopped() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    debug!(transport = %shared.name, "Receive loop exited");
}

async fn read_frames(
    shared: &Shared,
    sender: &TransportSender,
    handler: &dyn StreamHandler,
    mut reader: Box<dyn FrameReader>,
) -> Exit {
    loop {
        let next = tokio::select! {
            _ = shared.stopped() => return Exit::Stopped,
            _ = shared.reconnect.notified() => {
                // A permit left over from the previous connection is stale
                if shared.writer.lock().await.is_none() {
                    return Exit::Reconnect(None);
                }
                continue;
            }
            next = reader.next() => next,
        };

        let frame = match next {
            None => return Exit::Reconnect(Some(TransportError::Closed)),
            Some(Err(err)) => return Exit::Reconnect(Some(err)),
            Some(Ok(frame)) => frame,
        };
        Counters::bump(&shared.counters.frames_received);

        match &frame {
            Frame::Close => return Exit::Reconnect(Some(TransportError::Closed)),
            Frame::Ping(_) | Frame::Pong(_) => {
                trace!(transport = %shared.name, ?frame, "Control frame");
                continue;
            }
            Frame::Text(_) | Frame::Binary(_) => {}
        }

        if let Some(text) = frame.as_text() {
            shared.diagnostics.lock().record_received(text);
        }

        let message = match handler.decode(&frame) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(err) => {
                warn!(transport = %shared.name, error = %err, "Dropping undecodable frame");
                continue;
            }
        };

        match AssertUnwindSafe(handler.on_message(message, sender))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Exit::Reconnect(Some(err)),
            Err(panic) => {
                return Exit::Reconnect(Some(TransportError::Handler(panic_message(panic))));
            }
        }
    }
}

async fn heartbeat_loop(shared: Arc<Shared>, interval: Duration) {
    let interval = interval.max(Duration::from_millis(1));
    let sender = TransportSender {
        shared: Arc::clone(&shared),
    };
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shared.stopped() => break,
            _ = ticker.tick() => {}
        }
        if shared.state() != ConnectionState::Connected {
            continue;
        }
        match sender.send(Frame::Ping(Vec::new())).await {
            Ok(status) => trace!(transport = %shared.name, ?status, "Heartbeat"),
            Err(TransportError::Shutdown) => break,
            // The send path has already woken the receive loop
            Err(err) => debug!(transport = %shared.name, error = %err, "Heartbeat failed"),
        }
    }

    debug!(transport = %shared.name, "Heartbeat loop exited");
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic".to_string()
    }
}
