use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{CanonicalSymbol, Exchange, Price, Timestamp, Volume};

/// Number of book levels carried on each side of a tick
pub const DEPTH_LEVELS: usize = 5;

/// Last trade, top-of-book depth and intraday statistics for one instrument
///
/// Gateways keep one working tick per subscribed symbol and update it in
/// place as exchange messages arrive. Only clones are ever published, so a
/// consumer's copy is never touched by a later update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub exchange: Exchange,
    pub datetime: Timestamp,
    pub gateway_name: String,
    #[serde(default)]
    pub name: String,

    /// Cumulative traded volume reported by the exchange (24h rolling on most venues)
    pub volume: Volume,
    pub last_price: Price,
    pub last_volume: Volume,

    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub pre_close: Price,

    pub bid_price: [Price; DEPTH_LEVELS],
    pub bid_volume: [Volume; DEPTH_LEVELS],
    pub ask_price: [Price; DEPTH_LEVELS],
    pub ask_volume: [Volume; DEPTH_LEVELS],
}

impl Tick {
    /// Empty working tick, all numeric fields zero
    pub fn new(
        symbol: impl Into<String>,
        exchange: Exchange,
        gateway_name: impl Into<String>,
        datetime: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            datetime,
            gateway_name: gateway_name.into(),
            name: String::new(),
            volume: Decimal::ZERO,
            last_price: Decimal::ZERO,
            last_volume: Decimal::ZERO,
            open_price: Decimal::ZERO,
            high_price: Decimal::ZERO,
            low_price: Decimal::ZERO,
            pre_close: Decimal::ZERO,
            bid_price: [Decimal::ZERO; DEPTH_LEVELS],
            bid_volume: [Decimal::ZERO; DEPTH_LEVELS],
            ask_price: [Decimal::ZERO; DEPTH_LEVELS],
            ask_volume: [Decimal::ZERO; DEPTH_LEVELS],
        }
    }

    pub fn canonical_symbol(&self) -> CanonicalSymbol {
        CanonicalSymbol::new(self.symbol.clone(), self.exchange)
    }

    /// `"{symbol}.{exchange}"`
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }

    /// True once a last price or either side of the top of book is known.
    /// Ticks failing this check must not be published.
    pub fn has_market_data(&self) -> bool {
        !self.last_price.is_zero() || !self.bid_price[0].is_zero() || !self.ask_price[0].is_zero()
    }
}
