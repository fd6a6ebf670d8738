use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CancelRequest, Direction, OrderStatus, OrderType};
use crate::values::{CanonicalSymbol, Exchange, Price, Timestamp, Volume};

/// Identifier generated by this process at send time, before the exchange
/// has acknowledged the order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalOrderId(pub String);

impl LocalOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Canonical order state, keyed by local id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub local_id: LocalOrderId,
    /// Exchange-assigned id, unknown until the exchange acknowledges
    pub exchange_id: Option<String>,
    pub symbol: String,
    pub exchange: Exchange,
    pub direction: Direction,
    pub order_type: OrderType,
    pub price: Price,
    pub volume: Volume,
    pub traded: Volume,
    pub status: OrderStatus,
    pub datetime: Timestamp,
    pub gateway_name: String,
}

impl Order {
    pub fn canonical_symbol(&self) -> CanonicalSymbol {
        CanonicalSymbol::new(self.symbol.clone(), self.exchange)
    }

    pub fn vt_symbol(&self) -> String {
        format!("{}.{}", self.symbol, self.exchange)
    }

    /// `"{gateway}.{local_id}"`, unique across gateways in one process
    pub fn vt_order_id(&self) -> String {
        format!("{}.{}", self.gateway_name, self.local_id)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Volume still waiting to be filled
    pub fn remaining(&self) -> Volume {
        (self.volume - self.traded).max(Decimal::ZERO)
    }

    pub fn create_cancel_request(&self) -> CancelRequest {
        CancelRequest {
            local_id: self.local_id.clone(),
            symbol: self.canonical_symbol(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderRequest;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        OrderRequest::limit(
            CanonicalSymbol::new("btcusdt", Exchange::Huobi),
            Direction::Long,
            dec!(2),
            dec!(30000),
        )
        .create_order(LocalOrderId::new("1"), "HUOBI", Utc::now())
    }

    #[test]
    fn test_new_order_is_submitting() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Submitting);
        assert_eq!(order.exchange_id, None);
        assert_eq!(order.remaining(), dec!(2));
        assert_eq!(order.vt_order_id(), "HUOBI.1");
    }

    #[test]
    fn test_cancel_request_targets_local_id() {
        let order = sample_order();
        let cancel = order.create_cancel_request();
        assert_eq!(cancel.local_id, order.local_id);
        assert_eq!(cancel.symbol.to_string(), "btcusdt.HUOBI");
    }
}
