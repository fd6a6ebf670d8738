use serde::{Deserialize, Serialize};

use super::{Direction, LocalOrderId};
use crate::values::{Exchange, Price, Timestamp, Volume};

/// One fill of an order; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    /// The parent order
    pub local_id: LocalOrderId,
    pub symbol: String,
    pub exchange: Exchange,
    pub direction: Direction,
    pub price: Price,
    pub volume: Volume,
    pub datetime: Timestamp,
    pub gateway_name: String,
}

impl Trade {
    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }

    pub fn vt_trade_id(&self) -> String {
        format!("{}.{}", self.gateway_name, self.trade_id)
    }
}
