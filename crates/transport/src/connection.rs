//! Connection seams
//!
//! The transport never touches a socket directly. A [`Connector`] opens a
//! connection and hands back its two halves; the tungstenite implementation
//! lives in [`crate::ws`], tests plug in in-memory fakes.

use async_trait::async_trait;

use crate::error::TransportError;

/// One WebSocket-level frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl Frame {
    /// Text payload, or the binary payload when it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(text) => Some(text),
            Frame::Binary(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Frame::Text(_) | Frame::Binary(_))
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_string())
    }
}

/// Write half of a live connection
#[async_trait]
pub trait FrameWriter: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a live connection
#[async_trait]
pub trait FrameReader: Send {
    /// Next frame, `None` once the stream has ended
    async fn next(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// A freshly opened connection
pub struct Connection {
    pub writer: Box<dyn FrameWriter>,
    pub reader: Box<dyn FrameReader>,
}

impl Connection {
    pub fn new(writer: impl FrameWriter + 'static, reader: impl FrameReader + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            reader: Box::new(reader),
        }
    }
}

/// Opens connections to one endpoint. Called again on every reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;

    /// Endpoint description for logs
    fn endpoint(&self) -> String;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for std::sync::Arc<C> {
    async fn connect(&self) -> Result<Connection, TransportError> {
        (**self).connect().await
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}
