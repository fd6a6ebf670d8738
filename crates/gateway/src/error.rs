//! Error types for the gateway crate

use meridian_core::{Exchange, LocalOrderId};
use meridian_order_manager::RegistryError;
use meridian_transport::TransportError;
use thiserror::Error;

/// REST failures, split by where they happened
#[derive(Error, Debug)]
pub enum RestError {
    /// The request never produced a response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The exchange accepted the request and reported an application error
    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RestError {
    /// True when the request failed before the exchange could judge it
    pub fn is_transport(&self) -> bool {
        matches!(self, RestError::Http(_) | RestError::Status { .. })
    }
}

/// An exchange message with an unexpected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed message: {0}")]
pub struct ProtocolError(pub String);

impl ProtocolError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<ProtocolError> for RestError {
    fn from(err: ProtocolError) -> Self {
        RestError::Parse(err.0)
    }
}

/// Gateway-level errors (adapter operations)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Order registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Gateway is not connected")]
    NotConnected,

    #[error("Order {0} has not been acknowledged by the exchange yet")]
    NotAcknowledged(LocalOrderId),

    #[error("Gateway is closed")]
    Shutdown,

    #[error("No adapter for exchange {0}")]
    UnsupportedExchange(Exchange),

    #[error("Symbol {symbol} does not belong to {gateway}")]
    ForeignSymbol { symbol: String, gateway: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
