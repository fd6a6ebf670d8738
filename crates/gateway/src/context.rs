//! Canonical event publishing for one gateway

use meridian_core::{Account, Bar, Contract, LogLevel, LogRecord, Order, Tick, Trade};
use meridian_event::{
    EVENT_ACCOUNT, EVENT_BAR, EVENT_CONTRACT, EVENT_LOG, EVENT_ORDER, EVENT_TICK, EVENT_TRADE,
    Event, EventData, EventEngine, keyed,
};
use meridian_order_manager::OrderListener;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle a gateway uses to put canonical objects on the bus
///
/// Ticks, bars, orders, trades and accounts go out twice: under the bare
/// type and under `"{type}.{key}"` so consumers can follow one instrument
/// or one order.
#[derive(Clone)]
pub struct GatewayContext {
    gateway_name: String,
    engine: Arc<EventEngine>,
}

impl GatewayContext {
    pub fn new(gateway_name: impl Into<String>, engine: Arc<EventEngine>) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            engine,
        }
    }

    pub fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    pub fn engine(&self) -> &Arc<EventEngine> {
        &self.engine
    }

    fn put(&self, kind: impl Into<String>, data: EventData) {
        let kind = kind.into();
        if let Err(e) = self.engine.put(Event::new(kind.clone(), data)) {
            debug!(gateway = %self.gateway_name, kind, error = %e, "Event not published");
        }
    }

    fn publish(&self, kind: &str, key: String, data: EventData) {
        self.put(kind, data.clone());
        self.put(keyed(kind, key), data);
    }

    pub fn on_tick(&self, tick: Tick) {
        let key = tick.vt_symbol();
        self.publish(EVENT_TICK, key, EventData::Tick(tick));
    }

    pub fn on_bar(&self, bar: Bar) {
        let key = bar.vt_symbol();
        self.publish(EVENT_BAR, key, EventData::Bar(bar));
    }

    pub fn on_order(&self, order: Order) {
        let key = order.vt_order_id();
        self.publish(EVENT_ORDER, key, EventData::Order(order));
    }

    pub fn on_trade(&self, trade: Trade) {
        let key = trade.vt_symbol();
        self.publish(EVENT_TRADE, key, EventData::Trade(trade));
    }

    pub fn on_account(&self, account: Account) {
        let key = account.vt_account_id();
        self.publish(EVENT_ACCOUNT, key, EventData::Account(account));
    }

    pub fn on_contract(&self, contract: Contract) {
        self.put(EVENT_CONTRACT, EventData::Contract(contract));
    }

    /// Log locally and publish a `log` event
    pub fn write_log(&self, msg: impl Into<String>) {
        let msg = msg.into();
        info!(gateway = %self.gateway_name, "{msg}");
        self.put(EVENT_LOG, EventData::Log(LogRecord::info(&self.gateway_name, msg)));
    }

    pub fn write_warning(&self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(gateway = %self.gateway_name, "{msg}");
        self.put(
            EVENT_LOG,
            EventData::Log(LogRecord::new(&self.gateway_name, LogLevel::Warn, msg)),
        );
    }
}

impl OrderListener for GatewayContext {
    fn on_order(&self, order: &Order) {
        GatewayContext::on_order(self, order.clone());
    }

    fn on_trade(&self, trade: &Trade) {
        GatewayContext::on_trade(self, trade.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::Exchange;
    use meridian_event::handler;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::time::{Duration, Instant};

    #[test]
    fn test_tick_published_under_bare_and_keyed_type() {
        let engine = Arc::new(EventEngine::new(Duration::from_secs(60)));
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        engine.register_general(handler(move |e| sink.lock().push(e.kind().to_string())));
        engine.start().unwrap();

        let ctx = GatewayContext::new("HUOBI", Arc::clone(&engine));
        let mut tick = Tick::new("btcusdt", Exchange::Huobi, "HUOBI", Utc::now());
        tick.last_price = dec!(1);
        ctx.on_tick(tick);

        let deadline = Instant::now() + Duration::from_secs(2);
        while kinds.lock().len() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        engine.stop();

        assert_eq!(*kinds.lock(), vec!["tick", "tick.btcusdt.HUOBI"]);
    }
}
