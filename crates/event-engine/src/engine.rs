//! Event engine: queue, dispatch thread and timer thread

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, select, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::event::{Event, Handler};
use crate::registry::HandlerRegistry;

/// Default spacing between `timer` events
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_secs(1);

enum Lifecycle {
    Idle,
    Running(Workers),
    Stopped,
}

struct Workers {
    /// Dropped to signal both threads
    stop_tx: Sender<()>,
    dispatcher: JoinHandle<()>,
    timer: JoinHandle<()>,
}

/// Publish/subscribe bus shared by reference across the process
///
/// `put` may be called from any number of threads and never blocks.
/// Handlers run on the single dispatch thread, so events of one type reach
/// a given handler in enqueue order.
pub struct EventEngine {
    interval: Duration,
    queue_tx: Sender<Event>,
    queue_rx: Receiver<Event>,
    registry: Arc<HandlerRegistry>,
    stopped: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TIMER_INTERVAL)
    }
}

impl EventEngine {
    pub fn new(interval: Duration) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            interval,
            queue_tx,
            queue_rx,
            registry: Arc::new(HandlerRegistry::new()),
            stopped: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn timer_interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the dispatch and timer threads
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running(_) => return Err(EngineError::AlreadyRunning),
            Lifecycle::Stopped => return Err(EngineError::Shutdown),
            Lifecycle::Idle => {}
        }

        let (stop_tx, stop_rx) = unbounded::<()>();

        let dispatcher = {
            let queue_rx = self.queue_rx.clone();
            let registry = Arc::clone(&self.registry);
            let stop_rx = stop_rx.clone();
            thread::Builder::new()
                .name("event-dispatch".to_string())
                .spawn(move || run_dispatch(queue_rx, stop_rx, registry))
                .map_err(|source| EngineError::Spawn {
                    name: "event-dispatch",
                    source,
                })?
        };

        let timer = {
            let queue_tx = self.queue_tx.clone();
            let interval = self.interval;
            thread::Builder::new()
                .name("event-timer".to_string())
                .spawn(move || run_timer(queue_tx, stop_rx, interval))
                .map_err(|source| EngineError::Spawn {
                    name: "event-timer",
                    source,
                })?
        };

        *lifecycle = Lifecycle::Running(Workers {
            stop_tx,
            dispatcher,
            timer,
        });
        info!(interval_ms = self.interval.as_millis() as u64, "Event engine started");
        Ok(())
    }

    /// Signal both threads and wait for them to exit. Idempotent.
    ///
    /// Called from inside a handler, the dispatch thread is signalled but
    /// not joined (it would be joining itself).
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);

        let Lifecycle::Running(workers) = previous else {
            return;
        };

        drop(workers.stop_tx);
        if workers.timer.join().is_err() {
            warn!("Event timer thread panicked");
        }
        if workers.dispatcher.thread().id() == thread::current().id() {
            debug!("Event engine stopped from a handler, dispatch thread exits on return");
        } else if workers.dispatcher.join().is_err() {
            warn!("Event dispatch thread panicked");
        }

        let discarded = self.queue_rx.len();
        info!(discarded, "Event engine stopped");
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
    }

    /// Enqueue an event; never blocks and never drops while the engine is live
    pub fn put(&self, event: Event) -> Result<(), EngineError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(EngineError::Shutdown);
        }
        // The engine owns a receiver, so the channel cannot be disconnected here
        self.queue_tx
            .send(event)
            .map_err(|_| EngineError::Shutdown)
    }

    /// Register `handler` for events of `kind`. Registering the same handler twice is a no-op.
    pub fn register(&self, kind: &str, handler: Handler) {
        self.registry.register(kind, handler);
    }

    /// Remove `handler` for `kind`; the last removal frees the type's slot
    pub fn unregister(&self, kind: &str, handler: &Handler) {
        self.registry.unregister(kind, handler);
    }

    /// Register a handler that receives every event
    pub fn register_general(&self, handler: Handler) {
        self.registry.register_general(handler);
    }

    pub fn unregister_general(&self, handler: &Handler) {
        self.registry.unregister_general(handler);
    }

    /// Number of handlers for `kind`, `None` when nothing is registered
    pub fn handler_count(&self, kind: &str) -> Option<usize> {
        self.registry.handler_count(kind)
    }

    pub fn general_handler_count(&self) -> usize {
        self.registry.general_count()
    }

    /// Events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.queue_rx.len()
    }
}

impl Drop for EventEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_dispatch(queue_rx: Receiver<Event>, stop_rx: Receiver<()>, registry: Arc<HandlerRegistry>) {
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(queue_rx) -> event => match event {
                Ok(event) => registry.dispatch(&event),
                Err(_) => break,
            },
        }
    }
    debug!("Event dispatch loop exited");
}

/// Sleeps on the stop channel so a stop request wakes it immediately
fn run_timer(queue_tx: Sender<Event>, stop_rx: Receiver<()>, interval: Duration) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if queue_tx.send(Event::timer(Utc::now())).is_err() {
                    break;
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Event timer loop exited");
}
