//! Send path shared by the transport, its loops and message handlers

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tracing::{debug, warn};

use crate::connection::{Frame, FrameWriter};
use crate::diagnostics::{ConnectionState, Counters, Diagnostics, TransportStats};
use crate::error::TransportError;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a fire-and-forget send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// No live connection, the frame was discarded
    Dropped,
}

pub(crate) struct Shared {
    pub name: String,
    pub writer: tokio::sync::Mutex<Option<Box<dyn FrameWriter>>>,
    pub state: watch::Sender<ConnectionState>,
    pub diagnostics: Mutex<Diagnostics>,
    pub counters: Counters,
    /// Wakes the receive loop when the send path finds the socket broken
    pub reconnect: Notify,
}

impl Shared {
    pub fn new(name: String) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            name,
            writer: tokio::sync::Mutex::new(None),
            state,
            diagnostics: Mutex::new(Diagnostics::default()),
            counters: Counters::default(),
            reconnect: Notify::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ConnectionState::Stopped
    }

    /// `Stopped` is terminal and never overwritten
    pub fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == ConnectionState::Stopped || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Returns the state before the call
    pub fn request_stop(&self) -> ConnectionState {
        self.state.send_replace(ConnectionState::Stopped)
    }

    /// Resolves once the transport is stopped
    pub async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Stopped).await;
    }

    pub async fn close_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(transport = %self.name, error = %e, "Close failed"),
                Err(_) => debug!(transport = %self.name, "Close timed out"),
            }
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.lock().clone()
    }
}

/// Cloneable handle for writing to whichever connection is currently live
#[derive(Clone)]
pub struct TransportSender {
    pub(crate) shared: Arc<Shared>,
}

impl TransportSender {
    /// Write one frame. Without a live connection the frame is dropped
    /// and `SendStatus::Dropped` returned; after `stop` this fails with
    /// `TransportError::Shutdown`.
    pub async fn send(&self, frame: Frame) -> Result<SendStatus, TransportError> {
        let shared = &self.shared;
        if shared.is_stopped() {
            return Err(TransportError::Shutdown);
        }

        let mut slot = shared.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            Counters::bump(&shared.counters.frames_dropped);
            debug!(transport = %shared.name, "No live connection, dropping frame");
            return Ok(SendStatus::Dropped);
        };

        if let Frame::Text(text) = &frame {
            shared.diagnostics.lock().record_sent(text);
        }

        match writer.send(frame).await {
            Ok(()) => {
                Counters::bump(&shared.counters.frames_sent);
                Ok(SendStatus::Sent)
            }
            Err(e) => {
                warn!(transport = %shared.name, error = %e, "Write failed, forcing reconnect");
                *slot = None;
                // Stores a permit when the receive loop is busy in a handler
                shared.reconnect.notify_one();
                Err(e)
            }
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<SendStatus, TransportError> {
        self.send(Frame::Text(text.into())).await
    }

    /// Serialize `payload` as JSON and send it as a text frame
    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<SendStatus, TransportError> {
        let text =
            serde_json::to_string(payload).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.send(Frame::Text(text)).await
    }

    /// Ask the transport to stop without waiting for its loops.
    /// Safe from inside handler callbacks.
    pub fn shutdown(&self) {
        self.shared.request_stop();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn stats(&self) -> TransportStats {
        self.shared.counters.snapshot()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }
}
