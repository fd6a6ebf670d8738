//! Event envelope and the canonical event type names

use chrono::{DateTime, Utc};
use meridian_core::{Account, Bar, Contract, LogRecord, Order, Tick, Trade};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub const EVENT_TIMER: &str = "timer";
pub const EVENT_TICK: &str = "tick";
pub const EVENT_BAR: &str = "bar";
pub const EVENT_ORDER: &str = "order";
pub const EVENT_TRADE: &str = "trade";
pub const EVENT_ACCOUNT: &str = "account";
pub const EVENT_CONTRACT: &str = "contract";
pub const EVENT_LOG: &str = "log";

/// Type name scoped to one key: `keyed(EVENT_TICK, "btcusdt.HUOBI")` is `tick.btcusdt.HUOBI`
pub fn keyed(kind: &str, key: impl fmt::Display) -> String {
    format!("{}.{}", kind, key)
}

/// Callback invoked by the dispatch thread
///
/// Identity is the `Arc` allocation: registering a clone of the same
/// handler twice is a no-op, a separately built closure is a new handler.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Payload carried by an [`Event`]
#[derive(Clone)]
pub enum EventData {
    Empty,
    Timer(DateTime<Utc>),
    Tick(Tick),
    Bar(Bar),
    Order(Order),
    Trade(Trade),
    Account(Account),
    Contract(Contract),
    Log(LogRecord),
    /// Anything a collaborator wants to route through the bus
    Custom(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::Empty => f.write_str("Empty"),
            EventData::Timer(at) => f.debug_tuple("Timer").field(at).finish(),
            EventData::Tick(tick) => f.debug_tuple("Tick").field(tick).finish(),
            EventData::Bar(bar) => f.debug_tuple("Bar").field(bar).finish(),
            EventData::Order(order) => f.debug_tuple("Order").field(order).finish(),
            EventData::Trade(trade) => f.debug_tuple("Trade").field(trade).finish(),
            EventData::Account(account) => f.debug_tuple("Account").field(account).finish(),
            EventData::Contract(contract) => f.debug_tuple("Contract").field(contract).finish(),
            EventData::Log(record) => f.debug_tuple("Log").field(record).finish(),
            EventData::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Immutable envelope: a type tag plus a payload
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    data: EventData,
}

impl Event {
    pub fn new(kind: impl Into<String>, data: EventData) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    pub fn timer(at: DateTime<Utc>) -> Self {
        Self::new(EVENT_TIMER, EventData::Timer(at))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match &self.data {
            EventData::Tick(tick) => Some(tick),
            _ => None,
        }
    }

    pub fn as_bar(&self) -> Option<&Bar> {
        match &self.data {
            EventData::Bar(bar) => Some(bar),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match &self.data {
            EventData::Order(order) => Some(order),
            _ => None,
        }
    }

    pub fn as_trade(&self) -> Option<&Trade> {
        match &self.data {
            EventData::Trade(trade) => Some(trade),
            _ => None,
        }
    }

    pub fn as_contract(&self) -> Option<&Contract> {
        match &self.data {
            EventData::Contract(contract) => Some(contract),
            _ => None,
        }
    }

    pub fn as_log(&self) -> Option<&LogRecord> {
        match &self.data {
            EventData::Log(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<DateTime<Utc>> {
        match &self.data {
            EventData::Timer(at) => Some(*at),
            _ => None,
        }
    }

    /// Downcast a `Custom` payload
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        match &self.data {
            EventData::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_type_names() {
        assert_eq!(keyed(EVENT_TICK, "btcusdt.HUOBI"), "tick.btcusdt.HUOBI");
        assert_eq!(keyed(EVENT_ORDER, "HUOBI.42"), "order.HUOBI.42");
    }

    #[test]
    fn test_custom_payload_downcast() {
        let event = Event::new("custom", EventData::Custom(Arc::new(7u32)));
        assert_eq!(event.downcast::<u32>(), Some(&7));
        assert_eq!(event.downcast::<String>(), None);
        assert!(event.as_tick().is_none());
    }
}
