//! Huobi wire shapes to canonical objects

use chrono::DateTime;
use meridian_core::{
    Account, Contract, DEPTH_LEVELS, Direction, Exchange, LocalOrderId, Order, OrderStatus,
    OrderType, Product, Tick, Timestamp,
};
use meridian_order_manager::OrderUpdate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{ProtocolError, RestError};

pub fn status_from_huobi(state: &str) -> Option<OrderStatus> {
    match state {
        "submitted" => Some(OrderStatus::NotTraded),
        "partial-filled" => Some(OrderStatus::PartiallyTraded),
        "filled" => Some(OrderStatus::AllTraded),
        "cancelling" | "partial-canceled" | "canceled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

pub fn order_type_to_huobi(direction: Direction, order_type: OrderType) -> &'static str {
    match (direction, order_type) {
        (Direction::Long, OrderType::Market) => "buy-market",
        (Direction::Short, OrderType::Market) => "sell-market",
        (Direction::Long, OrderType::Limit) => "buy-limit",
        (Direction::Short, OrderType::Limit) => "sell-limit",
    }
}

pub fn order_type_from_huobi(kind: &str) -> Option<(Direction, OrderType)> {
    match kind {
        "buy-market" => Some((Direction::Long, OrderType::Market)),
        "sell-market" => Some((Direction::Short, OrderType::Market)),
        "buy-limit" => Some((Direction::Long, OrderType::Limit)),
        "sell-limit" => Some((Direction::Short, OrderType::Limit)),
        _ => None,
    }
}

/// Turn `{"status": "error", "err-code", "err-msg"}` into `RestError::Api`
pub fn check_error(response: Value) -> Result<Value, RestError> {
    if response.get("status").and_then(Value::as_str) != Some("error") {
        return Ok(response);
    }
    Err(RestError::Api {
        code: text(&response, "err-code").unwrap_or_default(),
        message: text(&response, "err-msg").unwrap_or_default(),
    })
}

/// `data` array of a response
fn data_array(response: &Value) -> Result<&Vec<Value>, ProtocolError> {
    response
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ProtocolError::new("missing data array"))
}

/// String or number field rendered as a string
fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(value: &Value, key: &str) -> Result<String, ProtocolError> {
    text(value, key).ok_or_else(|| ProtocolError::new(format!("missing {key}")))
}

/// Decimal from a JSON string or number
pub fn decimal(value: &Value) -> Result<Decimal, ProtocolError> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(ProtocolError::new(format!("not a number: {other}"))),
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|e| ProtocolError::new(format!("bad decimal {raw}: {e}")))
}

fn decimal_field(value: &Value, key: &str) -> Result<Decimal, ProtocolError> {
    let field = value
        .get(key)
        .ok_or_else(|| ProtocolError::new(format!("missing {key}")))?;
    decimal(field)
}

pub fn timestamp_ms(ms: i64) -> Result<Timestamp, ProtocolError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| ProtocolError::new(format!("bad timestamp {ms}")))
}

fn timestamp_field(value: &Value, key: &str) -> Result<Timestamp, ProtocolError> {
    let ms = value
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ProtocolError::new(format!("missing {key}")))?;
    timestamp_ms(ms)
}

/// `10^-precision`
fn step(precision: u32) -> Decimal {
    Decimal::new(1, precision.min(28))
}

/// `/v1/common/symbols`
pub fn parse_contracts(response: &Value, gateway_name: &str) -> Result<Vec<Contract>, ProtocolError> {
    data_array(response)?
        .iter()
        .map(|d| {
            let base = required_text(d, "base-currency")?;
            let quote = required_text(d, "quote-currency")?;
            let precision = |key: &str| {
                d.get(key)
                    .and_then(Value::as_u64)
                    .map(|p| p as u32)
                    .ok_or_else(|| ProtocolError::new(format!("missing {key}")))
            };
            Ok(Contract {
                symbol: required_text(d, "symbol")?,
                exchange: Exchange::Huobi,
                name: format!("{}/{}", base.to_uppercase(), quote.to_uppercase()),
                product: Product::Spot,
                size: Decimal::ONE,
                price_tick: step(precision("price-precision")?),
                min_volume: step(precision("amount-precision")?),
                gateway_name: gateway_name.to_string(),
            })
        })
        .collect()
}

/// Id of the spot account in `/v1/account/accounts`
pub fn parse_spot_account_id(response: &Value) -> Result<Option<String>, ProtocolError> {
    Ok(data_array(response)?
        .iter()
        .find(|d| d.get("type").and_then(Value::as_str) == Some("spot"))
        .and_then(|d| text(d, "id")))
}

/// `/v1/account/accounts/{id}/balance`: one account per currency with a
/// non-zero balance, balance = trade + frozen
pub fn parse_balances(response: &Value, gateway_name: &str) -> Result<Vec<Account>, ProtocolError> {
    let list = response
        .get("data")
        .and_then(|d| d.get("list"))
        .and_then(Value::as_array)
        .ok_or_else(|| ProtocolError::new("missing data.list"))?;

    let mut by_currency: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for entry in list {
        let currency = required_text(entry, "currency")?;
        let amount = decimal_field(entry, "balance")?;
        let slot = by_currency.entry(currency).or_default();
        match entry.get("type").and_then(Value::as_str) {
            Some("trade") => slot.0 += amount,
            Some("frozen") => slot.1 += amount,
            _ => {}
        }
    }

    Ok(by_currency
        .into_iter()
        .map(|(currency, (trade, frozen))| Account {
            account_id: currency,
            balance: trade + frozen,
            frozen,
            gateway_name: gateway_name.to_string(),
        })
        .filter(|account| !account.balance.is_zero())
        .collect())
}

/// A working order reported by `/v1/order/openOrders`
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub exchange_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub order_type: OrderType,
    pub price: Decimal,
    pub volume: Decimal,
    pub traded: Decimal,
    pub status: OrderStatus,
    pub datetime: Timestamp,
}

impl OpenOrder {
    pub fn into_order(self, local_id: LocalOrderId, gateway_name: &str) -> Order {
        Order {
            local_id,
            exchange_id: Some(self.exchange_id),
            symbol: self.symbol,
            exchange: Exchange::Huobi,
            direction: self.direction,
            order_type: self.order_type,
            price: self.price,
            volume: self.volume,
            traded: self.traded,
            status: self.status,
            datetime: self.datetime,
            gateway_name: gateway_name.to_string(),
        }
    }
}

pub fn parse_open_orders(response: &Value) -> Result<Vec<OpenOrder>, ProtocolError> {
    data_array(response)?
        .iter()
        .map(|d| {
            let kind = required_text(d, "type")?;
            let (direction, order_type) = order_type_from_huobi(&kind)
                .ok_or_else(|| ProtocolError::new(format!("unknown order type {kind}")))?;
            let state = required_text(d, "state")?;
            let status = status_from_huobi(&state)
                .ok_or_else(|| ProtocolError::new(format!("unknown order state {state}")))?;
            Ok(OpenOrder {
                exchange_id: required_text(d, "id")?,
                symbol: required_text(d, "symbol")?,
                direction,
                order_type,
                price: decimal_field(d, "price")?,
                volume: decimal_field(d, "amount")?,
                traded: decimal_field(d, "filled-amount")?,
                status,
                datetime: timestamp_field(d, "created-at")?,
            })
        })
        .collect()
}

/// Exchange id returned by `/v1/order/orders/place`
pub fn parse_placed_order_id(response: &Value) -> Result<String, ProtocolError> {
    text(response, "data").ok_or_else(|| ProtocolError::new("missing order id"))
}

/// `market.{symbol}.{topic}` -> symbol
pub fn channel_symbol(channel: &str) -> Result<&str, ProtocolError> {
    channel
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProtocolError::new(format!("bad channel {channel}")))
}

fn tick_payload(message: &Value) -> Result<&Value, ProtocolError> {
    message
        .get("tick")
        .ok_or_else(|| ProtocolError::new("missing tick"))
}

fn levels(book: &Value, side: &str) -> Result<Vec<(Decimal, Decimal)>, ProtocolError> {
    let Some(entries) = book.get(side).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    entries
        .iter()
        .take(DEPTH_LEVELS)
        .map(|level| match level.as_array().map(Vec::as_slice) {
            Some([price, volume, ..]) => Ok((decimal(price)?, decimal(volume)?)),
            _ => Err(ProtocolError::new(format!("bad {side} level"))),
        })
        .collect()
}

/// Fold a `depth.step*` message into the working tick. Missing levels
/// are zeroed.
pub fn apply_depth(tick: &mut Tick, message: &Value) -> Result<(), ProtocolError> {
    let datetime = timestamp_field(message, "ts")?;
    let book = tick_payload(message)?;
    let bids = levels(book, "bids")?;
    let asks = levels(book, "asks")?;

    tick.datetime = datetime;
    for n in 0..DEPTH_LEVELS {
        let (bp, bv) = bids.get(n).copied().unwrap_or_default();
        let (ap, av) = asks.get(n).copied().unwrap_or_default();
        tick.bid_price[n] = bp;
        tick.bid_volume[n] = bv;
        tick.ask_price[n] = ap;
        tick.ask_volume[n] = av;
    }
    Ok(())
}

/// Fold a `detail` message (24h statistics) into the working tick
pub fn apply_detail(tick: &mut Tick, message: &Value) -> Result<(), ProtocolError> {
    let datetime = timestamp_field(message, "ts")?;
    let detail = tick_payload(message)?;
    let open = decimal_field(detail, "open")?;
    let high = decimal_field(detail, "high")?;
    let low = decimal_field(detail, "low")?;
    let close = decimal_field(detail, "close")?;
    let volume = decimal_field(detail, "vol")?;

    tick.datetime = datetime;
    tick.open_price = open;
    tick.high_price = high;
    tick.low_price = low;
    tick.last_price = close;
    tick.volume = volume;
    Ok(())
}

/// `orders.{symbol}` notification: exchange id plus the update it carries.
/// `filled-amount` is the quantity filled by this event alone.
pub fn parse_order_push(data: &Value) -> Result<(String, OrderUpdate), ProtocolError> {
    let exchange_id = required_text(data, "order-id")?;
    let filled = decimal_field(data, "filled-amount")?;

    let mut update = OrderUpdate::new().increment(filled);
    if let Some(status) = text(data, "order-state").as_deref().and_then(status_from_huobi) {
        update = update.status(status);
    }
    if let Some(price) = data.get("price").map(decimal).transpose()? {
        update = update.fill_price(price);
    }
    if let Some(seq) = text(data, "seq-id") {
        update = update.trade_id(seq);
    }
    if let Some(ms) = data.get("created-at").and_then(Value::as_i64) {
        update = update.at(timestamp_ms(ms)?);
    }
    Ok((exchange_id, update))
}
