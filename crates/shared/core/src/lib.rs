//! Meridian Core Domain
//!
//! Canonical trading objects every gateway normalizes into: ticks, bars,
//! orders, trades, account balances and contracts. This crate contains no
//! async and no I/O.

pub mod entities;
pub mod market;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    Account, CancelRequest, Contract, Direction, LocalOrderId, LogLevel, LogRecord, Order,
    OrderRequest, OrderStatus, OrderType, Product, SubscribeRequest, Trade,
};
pub use market::{Bar, DEPTH_LEVELS, Tick};
pub use values::{
    CanonicalSymbol, Exchange, Interval, ParseExchangeError, ParseSymbolError, Price, Timestamp,
    Volume,
};
