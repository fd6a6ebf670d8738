//! Working tick copies, one per subscribed symbol

use chrono::Utc;
use meridian_core::{Exchange, Tick};
use std::collections::HashMap;

/// Ticks a gateway updates in place as depth and trade messages arrive.
///
/// Callers only ever get clones out, and only once the tick carries a
/// price, so published ticks are never all-zero and never change later.
#[derive(Debug)]
pub struct TickBook {
    exchange: Exchange,
    gateway_name: String,
    ticks: HashMap<String, Tick>,
}

impl TickBook {
    pub fn new(exchange: Exchange, gateway_name: impl Into<String>) -> Self {
        Self {
            exchange,
            gateway_name: gateway_name.into(),
            ticks: HashMap::new(),
        }
    }

    /// Create the working tick for `symbol`; keeps an existing one
    pub fn track(&mut self, symbol: &str, name: &str) {
        self.ticks.entry(symbol.to_string()).or_insert_with(|| {
            let mut tick = Tick::new(symbol, self.exchange, self.gateway_name.clone(), Utc::now());
            tick.name = name.to_string();
            tick
        });
    }

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.ticks.contains_key(symbol)
    }

    /// Mutate the working tick for `symbol` and return a snapshot when it
    /// has market data. `None` for untracked symbols.
    pub fn update<E>(
        &mut self,
        symbol: &str,
        apply: impl FnOnce(&mut Tick) -> Result<(), E>,
    ) -> Result<Option<Tick>, E> {
        let Some(tick) = self.ticks.get_mut(symbol) else {
            return Ok(None);
        };
        apply(tick)?;
        Ok(tick.has_market_data().then(|| tick.clone()))
    }

    pub fn get(&self, symbol: &str) -> Option<&Tick> {
        self.ticks.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.ticks.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::convert::Infallible;

    #[test]
    fn test_snapshot_only_with_market_data() {
        let mut book = TickBook::new(Exchange::Huobi, "HUOBI");
        book.track("btcusdt", "BTC/USDT");

        let empty = book
            .update("btcusdt", |tick| {
                tick.volume = dec!(10);
                Ok::<_, Infallible>(())
            })
            .unwrap();
        assert!(empty.is_none());

        let priced = book
            .update("btcusdt", |tick| {
                tick.bid_price[0] = dec!(100);
                Ok::<_, Infallible>(())
            })
            .unwrap();
        let snapshot = priced.unwrap();
        assert_eq!(snapshot.name, "BTC/USDT");
        assert_eq!(snapshot.volume, dec!(10));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut book = TickBook::new(Exchange::Huobi, "HUOBI");
        book.track("btcusdt", "");

        let first = book
            .update("btcusdt", |tick| {
                tick.last_price = dec!(1);
                Ok::<_, Infallible>(())
            })
            .unwrap()
            .unwrap();
        book.update("btcusdt", |tick| {
            tick.last_price = dec!(2);
            Ok::<_, Infallible>(())
        })
        .unwrap();

        assert_eq!(first.last_price, dec!(1));
        assert_eq!(book.get("btcusdt").unwrap().last_price, dec!(2));
    }

    #[test]
    fn test_untracked_symbol() {
        let mut book = TickBook::new(Exchange::Huobi, "HUOBI");
        let result = book.update("ethusdt", |_| Ok::<_, Infallible>(())).unwrap();
        assert!(result.is_none());
        assert!(!book.is_tracked("ethusdt"));
    }
}
