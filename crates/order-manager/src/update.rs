//! Order updates and how they fold into an order

use meridian_core::{Order, OrderStatus, Price, Timestamp, Volume};
use rust_decimal::Decimal;

/// How an update reports the filled quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradedVolume {
    /// Total filled so far
    Cumulative(Volume),
    /// Filled by this update alone
    Increment(Volume),
}

/// A partial change to an order, as reported by an exchange
///
/// Every field is optional; absent fields leave the order untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub traded: Option<TradedVolume>,
    /// Price of the fill carried by this update, defaults to the order price
    pub fill_price: Option<Price>,
    pub trade_id: Option<String>,
    pub datetime: Option<Timestamp>,
}

impl OrderUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn cumulative(mut self, traded: Volume) -> Self {
        self.traded = Some(TradedVolume::Cumulative(traded));
        self
    }

    pub fn increment(mut self, filled: Volume) -> Self {
        self.traded = Some(TradedVolume::Increment(filled));
        self
    }

    pub fn fill_price(mut self, price: Price) -> Self {
        self.fill_price = Some(price);
        self
    }

    pub fn trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(trade_id.into());
        self
    }

    pub fn at(mut self, datetime: Timestamp) -> Self {
        self.datetime = Some(datetime);
        self
    }
}

/// What folding an update into an order changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Effect {
    pub changed: bool,
    /// Newly filled volume, when positive
    pub filled: Option<Volume>,
}

/// Fold `update` into `order`.
///
/// Traded volume only grows and is capped at the requested volume. The
/// resulting status is the furthest along of the current status, the
/// reported one and the one implied by the traded volume; a full fill
/// outranks a reported cancel. Terminal orders are never touched.
pub(crate) fn apply(order: &mut Order, update: &OrderUpdate) -> Effect {
    if order.status.is_terminal() {
        return Effect {
            changed: false,
            filled: None,
        };
    }

    let previous = order.traded;
    let target = match update.traded {
        Some(TradedVolume::Cumulative(total)) => total,
        Some(TradedVolume::Increment(filled)) => previous + filled.max(Decimal::ZERO),
        None => previous,
    };
    let traded = target.max(previous).min(order.volume.max(previous));
    let filled = traded - previous;

    let implied = if order.volume > Decimal::ZERO && traded >= order.volume {
        Some(OrderStatus::AllTraded)
    } else if traded > Decimal::ZERO {
        Some(OrderStatus::PartiallyTraded)
    } else {
        None
    };

    let status = resolve_status(order.status, update.status, implied);
    let changed = status != order.status || filled > Decimal::ZERO;

    order.traded = traded;
    order.status = status;
    if let Some(datetime) = update.datetime {
        order.datetime = datetime;
    }

    Effect {
        changed,
        filled: (filled > Decimal::ZERO).then_some(filled),
    }
}

fn resolve_status(
    current: OrderStatus,
    reported: Option<OrderStatus>,
    implied: Option<OrderStatus>,
) -> OrderStatus {
    if implied == Some(OrderStatus::AllTraded) {
        return OrderStatus::AllTraded;
    }
    if let Some(reported @ (OrderStatus::Cancelled | OrderStatus::Rejected)) = reported {
        return reported;
    }
    [Some(current), reported, implied]
        .into_iter()
        .flatten()
        .max_by_key(|status| status.progress())
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{CanonicalSymbol, Direction, Exchange, LocalOrderId, OrderRequest};
    use rust_decimal_macros::dec;

    fn order(volume: Decimal) -> Order {
        OrderRequest::limit(
            CanonicalSymbol::new("btcusdt", Exchange::Huobi),
            Direction::Long,
            volume,
            dec!(100),
        )
        .create_order(LocalOrderId::from("1"), "HUOBI", Utc::now())
    }

    #[test]
    fn test_cumulative_fill_advances_status() {
        let mut order = order(dec!(10));
        let effect = apply(&mut order, &OrderUpdate::new().cumulative(dec!(4)));

        assert_eq!(effect.filled, Some(dec!(4)));
        assert_eq!(order.traded, dec!(4));
        assert_eq!(order.status, OrderStatus::PartiallyTraded);
    }

    #[test]
    fn test_traded_never_decreases_or_overfills() {
        let mut order = order(dec!(10));
        apply(&mut order, &OrderUpdate::new().cumulative(dec!(6)));

        let stale = apply(&mut order, &OrderUpdate::new().cumulative(dec!(3)));
        assert_eq!(stale.filled, None);
        assert_eq!(order.traded, dec!(6));

        let over = apply(&mut order, &OrderUpdate::new().increment(dec!(7)));
        assert_eq!(over.filled, Some(dec!(4)));
        assert_eq!(order.traded, dec!(10));
        assert_eq!(order.status, OrderStatus::AllTraded);
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let mut order = order(dec!(10));
        apply(&mut order, &OrderUpdate::new().cumulative(dec!(2)));

        let effect = apply(&mut order, &OrderUpdate::new().status(OrderStatus::NotTraded));
        assert!(!effect.changed);
        assert_eq!(order.status, OrderStatus::PartiallyTraded);
    }

    #[test]
    fn test_cancel_with_final_fill() {
        let mut order = order(dec!(10));
        apply(
            &mut order,
            &OrderUpdate::new()
                .status(OrderStatus::Cancelled)
                .cumulative(dec!(3)),
        );
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.traded, dec!(3));
    }

    #[test]
    fn test_full_fill_outranks_cancel() {
        let mut order = order(dec!(10));
        apply(
            &mut order,
            &OrderUpdate::new()
                .status(OrderStatus::Cancelled)
                .cumulative(dec!(10)),
        );
        assert_eq!(order.status, OrderStatus::AllTraded);
    }

    #[test]
    fn test_terminal_order_is_frozen() {
        let mut order = order(dec!(10));
        apply(&mut order, &OrderUpdate::new().status(OrderStatus::Cancelled));
        let before = order.clone();

        let effect = apply(
            &mut order,
            &OrderUpdate::new()
                .status(OrderStatus::PartiallyTraded)
                .cumulative(dec!(5))
                .at(Utc::now()),
        );
        assert!(!effect.changed);
        assert_eq!(order, before);
    }
}
