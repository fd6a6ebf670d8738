//! Market data stream: depth and 24h detail into ticks, ticks into bars

use async_trait::async_trait;
use meridian_core::{Exchange, Tick};
use meridian_transport::{Frame, StreamHandler, TransportError, TransportSender};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::decode_frame;
use super::mapping::{apply_depth, apply_detail, channel_symbol};
use crate::bar::BarAggregator;
use crate::context::GatewayContext;
use crate::error::ProtocolError;
use crate::ticks::TickBook;

const DEPTH_TOPIC: &str = "depth.step0";

struct MarketState {
    book: TickBook,
    bars: BarAggregator,
    bar_symbols: BTreeSet<String>,
}

/// [`StreamHandler`] for `market.*` channels
pub(crate) struct MarketStream {
    ctx: GatewayContext,
    names: Arc<RwLock<HashMap<String, String>>>,
    state: Mutex<MarketState>,
    req_id: AtomicU64,
}

impl MarketStream {
    pub(crate) fn new(ctx: GatewayContext, names: Arc<RwLock<HashMap<String, String>>>) -> Self {
        let book = TickBook::new(Exchange::Huobi, ctx.gateway_name());
        let bar_ctx = ctx.clone();
        let bars = BarAggregator::minute(move |bar| bar_ctx.on_bar(bar));
        Self {
            ctx,
            names,
            state: Mutex::new(MarketState {
                book,
                bars,
                bar_symbols: BTreeSet::new(),
            }),
            req_id: AtomicU64::new(0),
        }
    }

    /// Start tracking `symbol`; true when it was not tracked before
    pub(crate) fn track(&self, symbol: &str, bars: bool) -> bool {
        let name = self.names.read().get(symbol).cloned().unwrap_or_default();
        let mut state = self.state.lock();
        if bars {
            state.bar_symbols.insert(symbol.to_string());
        }
        let new = !state.book.is_tracked(symbol);
        state.book.track(symbol, &name);
        new
    }

    pub(crate) fn tick(&self, symbol: &str) -> Option<Tick> {
        self.state.lock().book.get(symbol).cloned()
    }

    /// Subscription requests for one symbol
    pub(crate) fn subscriptions(&self, symbol: &str) -> [Value; 2] {
        [
            json!({"sub": format!("market.{symbol}.{DEPTH_TOPIC}"), "id": self.next_id()}),
            json!({"sub": format!("market.{symbol}.detail"), "id": self.next_id()}),
        ]
    }

    fn next_id(&self) -> String {
        (self.req_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn on_channel(&self, channel: &str, message: &Value) -> Result<(), ProtocolError> {
        let symbol = channel_symbol(channel)?;
        let mut state = self.state.lock();
        let snapshot = if channel.contains(".depth.") {
            state.book.update(symbol, |tick| apply_depth(tick, message))?
        } else if channel.ends_with(".detail") {
            state.book.update(symbol, |tick| apply_detail(tick, message))?
        } else {
            debug!(channel, "Ignoring channel");
            return Ok(());
        };

        if let Some(tick) = snapshot {
            if state.bar_symbols.contains(symbol) {
                state.bars.update(&tick);
            }
            self.ctx.on_tick(tick);
        }
        Ok(())
    }
}

#[async_trait]
impl StreamHandler for MarketStream {
    fn decode(&self, frame: &Frame) -> Result<Option<Value>, TransportError> {
        decode_frame(frame)
    }

    async fn on_connected(&self, sender: &TransportSender) {
        self.ctx.write_log("Market data stream connected");
        let symbols: Vec<String> = self.state.lock().book.symbols().map(str::to_string).collect();
        for symbol in symbols {
            for request in self.subscriptions(&symbol) {
                if let Err(e) = sender.send_json(&request).await {
                    warn!(gateway = %self.ctx.gateway_name(), %symbol, error = %e, "Resubscribe failed");
                }
            }
        }
    }

    async fn on_disconnected(&self) {
        info!(gateway = %self.ctx.gateway_name(), "Market data stream disconnected");
    }

    async fn on_message(&self, message: Value, sender: &TransportSender) -> Result<(), TransportError> {
        if let Some(ping) = message.get("ping") {
            sender.send_json(&json!({ "pong": ping })).await?;
            return Ok(());
        }

        if let Some(channel) = message.get("ch").and_then(Value::as_str) {
            if let Err(e) = self.on_channel(channel, &message) {
                warn!(gateway = %self.ctx.gateway_name(), channel, error = %e, "Dropping market message");
            }
            return Ok(());
        }

        if message.get("status").and_then(Value::as_str) == Some("error") {
            let code = message.get("err-code").and_then(Value::as_str).unwrap_or_default();
            let msg = message.get("err-msg").and_then(Value::as_str).unwrap_or_default();
            self.ctx.write_warning(format!("Market data error {code}: {msg}"));
        } else if let Some(subbed) = message.get("subbed") {
            debug!(gateway = %self.ctx.gateway_name(), %subbed, "Subscribed");
        }
        Ok(())
    }
}
