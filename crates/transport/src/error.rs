//! Error types for the transport crate

use thiserror::Error;

/// Transport and protocol level failures
///
/// None of these are fatal to a running transport: connection failures
/// lead to a reconnect, decode failures drop the offending frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Failed to encode payload: {0}")]
    Encode(String),

    #[error("Message handler failed: {0}")]
    Handler(String),

    #[error("Transport is stopped")]
    Shutdown,
}

impl TransportError {
    pub fn handler(err: impl std::fmt::Display) -> Self {
        TransportError::Handler(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}
