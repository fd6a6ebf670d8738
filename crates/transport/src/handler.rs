//! Per-exchange protocol hooks

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::connection::Frame;
use crate::diagnostics::Diagnostics;
use crate::error::TransportError;
use crate::sender::TransportSender;

/// Protocol behavior injected into a [`crate::StreamingTransport`]
///
/// Only `on_message` is required. `decode` defaults to JSON; returning
/// `Ok(None)` skips a frame silently, `Err` drops it with a warning.
/// An error or panic out of `on_message` is reported through `on_error`
/// and the connection is recycled.
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    fn decode(&self, frame: &Frame) -> Result<Option<Value>, TransportError> {
        decode_json(frame)
    }

    /// Called after every successful connect, before the first frame is read
    async fn on_connected(&self, sender: &TransportSender) {
        let _ = sender;
    }

    async fn on_disconnected(&self) {}

    async fn on_message(&self, message: Value, sender: &TransportSender)
    -> Result<(), TransportError>;

    fn on_error(&self, error: &TransportError, diagnostics: &Diagnostics) {
        warn!(error = %error, %diagnostics, "Transport error");
    }
}

/// Parse a text or binary frame as JSON; control frames yield `None`
pub fn decode_json(frame: &Frame) -> Result<Option<Value>, TransportError> {
    match frame {
        Frame::Text(text) => Ok(Some(serde_json::from_str(text)?)),
        Frame::Binary(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_frames() {
        let value = decode_json(&Frame::Text(r#"{"ch":"market"}"#.into())).unwrap();
        assert_eq!(value.unwrap()["ch"], "market");

        let value = decode_json(&Frame::Binary(br#"[1,2]"#.to_vec())).unwrap();
        assert_eq!(value.unwrap()[1], 2);

        assert_eq!(decode_json(&Frame::Ping(vec![])).unwrap(), None);
    }

    #[test]
    fn test_decode_json_rejects_garbage() {
        let err = decode_json(&Frame::Text("not json".into())).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
