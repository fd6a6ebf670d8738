mod exchange;
mod interval;
mod symbol;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use exchange::{Exchange, ParseExchangeError};
pub use interval::Interval;
pub use symbol::{CanonicalSymbol, ParseSymbolError};

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Volume value - uses Decimal for precision
pub type Volume = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
