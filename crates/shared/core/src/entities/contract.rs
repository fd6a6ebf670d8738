use serde::{Deserialize, Serialize};

use crate::values::{CanonicalSymbol, Exchange, Price, Volume};

/// Product class of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    Spot,
    Futures,
    Swap,
}

/// Static description of a tradeable instrument, as discovered from the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub symbol: String,
    pub exchange: Exchange,
    /// Human readable name, e.g. `BTC/USDT`
    pub name: String,
    pub product: Product,
    pub size: Volume,
    pub price_tick: Price,
    pub min_volume: Volume,
    pub gateway_name: String,
}

impl Contract {
    pub fn canonical_symbol(&self) -> CanonicalSymbol {
        CanonicalSymbol::new(self.symbol.clone(), self.exchange)
    }

    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }
}
