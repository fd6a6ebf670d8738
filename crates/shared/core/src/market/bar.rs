use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{CanonicalSymbol, Exchange, Interval, Price, Timestamp, Volume};

/// OHLCV aggregate for one instrument over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub exchange: Exchange,
    pub interval: Interval,
    /// Window start
    pub datetime: Timestamp,
    pub gateway_name: String,
    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub close_price: Price,
    pub volume: Volume,
}

impl Bar {
    /// Bar seeded from a single price: open = high = low = close
    pub fn open_at(
        symbol: &CanonicalSymbol,
        interval: Interval,
        window_start: Timestamp,
        gateway_name: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            symbol: symbol.symbol().to_string(),
            exchange: symbol.exchange(),
            interval,
            datetime: window_start,
            gateway_name: gateway_name.into(),
            open_price: price,
            high_price: price,
            low_price: price,
            close_price: price,
            volume: Decimal::ZERO,
        }
    }

    /// Fold one trade price into the bar
    pub fn update_price(&mut self, price: Price) {
        self.high_price = self.high_price.max(price);
        self.low_price = self.low_price.min(price);
        self.close_price = price;
    }

    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_price_keeps_ohlc_invariants() {
        let symbol = CanonicalSymbol::new("btcusdt", Exchange::Huobi);
        let mut bar = Bar::open_at(&symbol, Interval::Minute, Utc::now(), "HUOBI", dec!(10));

        bar.update_price(dec!(12));
        bar.update_price(dec!(9));
        bar.update_price(dec!(11));

        assert_eq!(bar.open_price, dec!(10));
        assert_eq!(bar.high_price, dec!(12));
        assert_eq!(bar.low_price, dec!(9));
        assert_eq!(bar.close_price, dec!(11));
        assert!(bar.high_price >= bar.open_price.max(bar.close_price));
        assert!(bar.low_price <= bar.open_price.min(bar.close_price));
    }
}
