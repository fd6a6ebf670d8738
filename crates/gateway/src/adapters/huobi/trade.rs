//! Order stream: authentication, `orders.{symbol}` subscriptions and
//! order pushes into the identity registry

use async_trait::async_trait;
use chrono::Utc;
use meridian_order_manager::{ApplyOutcome, OrderIdentityRegistry};
use meridian_transport::{Frame, StreamHandler, TransportError, TransportSender};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::decode_frame;
use super::mapping::parse_order_push;
use super::sign::HuobiSigner;
use crate::context::GatewayContext;

/// [`StreamHandler`] for the authenticated order channel
pub(crate) struct TradeStream {
    ctx: GatewayContext,
    registry: Arc<OrderIdentityRegistry>,
    signer: HuobiSigner,
    host: String,
    path: String,
    symbols: Mutex<BTreeSet<String>>,
    authenticated: AtomicBool,
    req_id: AtomicU64,
}

impl TradeStream {
    pub(crate) fn new(
        ctx: GatewayContext,
        registry: Arc<OrderIdentityRegistry>,
        signer: HuobiSigner,
        host: String,
        path: String,
    ) -> Self {
        Self {
            ctx,
            registry,
            signer,
            host,
            path,
            symbols: Mutex::new(BTreeSet::new()),
            authenticated: AtomicBool::new(false),
            req_id: AtomicU64::new(0),
        }
    }

    /// Remember `symbol`; true when it was not tracked before
    pub(crate) fn track(&self, symbol: &str) -> bool {
        self.symbols.lock().insert(symbol.to_string())
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub(crate) fn subscription(&self, symbol: &str) -> Value {
        let cid = self.req_id.fetch_add(1, Ordering::Relaxed) + 1;
        json!({"op": "sub", "cid": cid.to_string(), "topic": format!("orders.{symbol}")})
    }

    fn auth_request(&self) -> Value {
        let mut request = Map::new();
        request.insert("op".into(), Value::from("auth"));
        for (key, value) in self
            .signer
            .signature_params("GET", &self.host, &self.path, &[], Utc::now())
        {
            request.insert(key, Value::from(value));
        }
        Value::Object(request)
    }

    async fn on_authenticated(&self, sender: &TransportSender) -> Result<(), TransportError> {
        self.authenticated.store(true, Ordering::SeqCst);
        self.ctx.write_log("Trade stream authenticated");
        let symbols: Vec<String> = self.symbols.lock().iter().cloned().collect();
        for symbol in symbols {
            sender.send_json(&self.subscription(&symbol)).await?;
        }
        Ok(())
    }

    fn on_notify(&self, message: &Value) {
        let topic = message.get("topic").and_then(Value::as_str).unwrap_or_default();
        if !topic.starts_with("orders") {
            debug!(topic, "Ignoring notification");
            return;
        }
        let Some(data) = message.get("data") else {
            warn!(gateway = %self.ctx.gateway_name(), topic, "Order push without data");
            return;
        };
        match parse_order_push(data) {
            Ok((exchange_id, update)) => {
                if self.registry.apply_update(&exchange_id, update) == ApplyOutcome::Buffered {
                    debug!(exchange_id, "Order push buffered until bound");
                }
            }
            Err(e) => {
                warn!(gateway = %self.ctx.gateway_name(), error = %e, "Dropping order push");
            }
        }
    }
}

#[async_trait]
impl StreamHandler for TradeStream {
    fn decode(&self, frame: &Frame) -> Result<Option<Value>, TransportError> {
        decode_frame(frame)
    }

    async fn on_connected(&self, sender: &TransportSender) {
        self.ctx.write_log("Trade stream connected");
        if let Err(e) = sender.send_json(&self.auth_request()).await {
            warn!(gateway = %self.ctx.gateway_name(), error = %e, "Auth request failed");
        }
    }

    async fn on_disconnected(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
        info!(gateway = %self.ctx.gateway_name(), "Trade stream disconnected");
    }

    async fn on_message(&self, message: Value, sender: &TransportSender) -> Result<(), TransportError> {
        let op = message.get("op").and_then(Value::as_str).unwrap_or_default();
        match op {
            "ping" => {
                let ts = message.get("ts").cloned().unwrap_or(Value::Null);
                sender.send_json(&json!({"op": "pong", "ts": ts})).await?;
            }
            "auth" => {
                let code = message.get("err-code").and_then(Value::as_i64).unwrap_or(0);
                if code == 0 {
                    self.on_authenticated(sender).await?;
                } else {
                    let msg = message.get("err-msg").and_then(Value::as_str).unwrap_or_default();
                    self.ctx.write_warning(format!("Trade stream auth failed {code}: {msg}"));
                }
            }
            "notify" => self.on_notify(&message),
            _ => {
                if let Some(msg) = message.get("err-msg").and_then(Value::as_str) {
                    if msg != "invalid pong" {
                        self.ctx.write_warning(format!("Trade stream error: {msg}"));
                    }
                }
            }
        }
        Ok(())
    }
}
