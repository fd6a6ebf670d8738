use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, LocalOrderId, Order, OrderStatus, OrderType};
use crate::values::{CanonicalSymbol, Price, Timestamp, Volume};

/// Request to stream market data for one instrument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub symbol: CanonicalSymbol,
    /// Also aggregate ticks into bars
    #[serde(default)]
    pub bars: bool,
}

/// Request to place a new order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: CanonicalSymbol,
    pub direction: Direction,
    pub order_type: OrderType,
    pub volume: Volume,
    pub price: Price,
}

impl OrderRequest {
    pub fn limit(symbol: CanonicalSymbol, direction: Direction, volume: Volume, price: Price) -> Self {
        Self {
            symbol,
            direction,
            order_type: OrderType::Limit,
            volume,
            price,
        }
    }

    pub fn market(symbol: CanonicalSymbol, direction: Direction, volume: Volume) -> Self {
        Self {
            symbol,
            direction,
            order_type: OrderType::Market,
            volume,
            price: Decimal::ZERO,
        }
    }

    /// Canonical order in `Submitting` state for this request
    pub fn create_order(
        &self,
        local_id: LocalOrderId,
        gateway_name: impl Into<String>,
        datetime: Timestamp,
    ) -> Order {
        Order {
            local_id,
            exchange_id: None,
            symbol: self.symbol.symbol().to_string(),
            exchange: self.symbol.exchange(),
            direction: self.direction,
            order_type: self.order_type,
            price: self.price,
            volume: self.volume,
            traded: Decimal::ZERO,
            status: OrderStatus::Submitting,
            datetime,
            gateway_name: gateway_name.into(),
        }
    }
}

/// Request to cancel a working order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub local_id: LocalOrderId,
    pub symbol: CanonicalSymbol,
}
