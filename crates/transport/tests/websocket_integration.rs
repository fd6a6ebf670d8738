//! WebSocket integration tests
//!
//! Runs the tungstenite connector against a real local server.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use meridian_transport::{
    ConnectionState, StreamHandler, StreamingTransport, TransportConfig, TransportError,
    TransportSender, WsConnector,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Greets every connection, echoes text, hangs up on `{"bye":true}`
async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                let _ = ws.send(Message::Text(r#"{"hello":true}"#.into())).await;
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        if text.as_str().contains("bye") {
                            let _ = ws.close(None).await;
                            return;
                        }
                        let _ = ws.send(Message::Text(text)).await;
                    }
                }
            });
        }
    });

    addr
}

#[derive(Default)]
struct Collector {
    messages: Mutex<Vec<Value>>,
}

#[async_trait]
impl StreamHandler for Collector {
    async fn on_message(&self, message: Value, _sender: &TransportSender) -> Result<(), TransportError> {
        self.messages.lock().push(message);
        Ok(())
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_websocket_round_trip_and_reconnect() {
    let addr = start_echo_server().await;
    let handler = Arc::new(Collector::default());
    let transport = StreamingTransport::new(
        "echo",
        WsConnector::new(format!("ws://{addr}")),
        Arc::clone(&handler) as Arc<dyn StreamHandler>,
        TransportConfig::default(),
    );

    transport.start().unwrap();
    assert!(wait_until(|| handler.messages.lock().len() == 1).await);
    assert_eq!(transport.state(), ConnectionState::Connected);

    transport.send_text(r#"{"echo":42}"#).await.unwrap();
    assert!(wait_until(|| handler.messages.lock().len() == 2).await);
    assert_eq!(handler.messages.lock()[1]["echo"], 42);

    // Server hangs up; the transport reconnects and is greeted again
    transport.send_text(r#"{"bye":true}"#).await.unwrap();
    assert!(wait_until(|| handler.messages.lock().len() == 3).await);
    assert_eq!(handler.messages.lock()[2]["hello"], true);
    assert_eq!(transport.stats().connects, 2);

    transport.stop().await;
    assert_eq!(transport.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn test_unreachable_endpoint_keeps_retrying() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let handler = Arc::new(Collector::default());
    let transport = StreamingTransport::new(
        "unreachable",
        WsConnector::new(format!("ws://{addr}")),
        Arc::clone(&handler) as Arc<dyn StreamHandler>,
        TransportConfig::default(),
    );

    transport.start().unwrap();
    assert!(wait_until(|| transport.stats().connect_attempts >= 3).await);
    assert_eq!(transport.stats().connects, 0);

    transport.stop().await;
}
