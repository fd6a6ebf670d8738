use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{Exchange, ParseExchangeError};

/// Globally unique instrument key: `(symbol, exchange)`, rendered `"{symbol}.{exchange}"`
///
/// Join key between ticks, bars, contracts and subscriptions. Fields are
/// private so a constructed symbol is never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalSymbol {
    symbol: String,
    exchange: Exchange,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSymbolError {
    #[error("Missing exchange suffix in {0:?}")]
    MissingExchange(String),
    #[error(transparent)]
    Exchange(#[from] ParseExchangeError),
}

impl CanonicalSymbol {
    pub fn new(symbol: impl Into<String>, exchange: Exchange) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }
}

impl fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.exchange)
    }
}

impl FromStr for CanonicalSymbol {
    type Err = ParseSymbolError;

    /// Splits on the last `.`, so symbols may themselves contain dots
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, exchange) = s
            .rsplit_once('.')
            .filter(|(symbol, _)| !symbol.is_empty())
            .ok_or_else(|| ParseSymbolError::MissingExchange(s.to_string()))?;
        Ok(Self::new(symbol, exchange.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_round_trip() {
        let symbol = CanonicalSymbol::new("btcusdt", Exchange::Huobi);
        assert_eq!(symbol.to_string(), "btcusdt.HUOBI");

        let parsed: CanonicalSymbol = "btcusdt.HUOBI".parse().unwrap();
        assert_eq!(parsed, symbol);
    }

    #[test]
    fn test_parse_rejects_missing_exchange() {
        assert!(matches!(
            "btcusdt".parse::<CanonicalSymbol>(),
            Err(ParseSymbolError::MissingExchange(_))
        ));
        assert!(matches!(
            "btcusdt.NASDAQ".parse::<CanonicalSymbol>(),
            Err(ParseSymbolError::Exchange(_))
        ));
    }
}
