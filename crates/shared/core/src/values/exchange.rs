use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exchanges the runtime knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Huobi,
    Zb,
    Binance,
    Okex,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown exchange: {0}")]
pub struct ParseExchangeError(pub String);

impl Exchange {
    /// Wire name used inside canonical symbols (`BTCUSDT.HUOBI`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Huobi => "HUOBI",
            Exchange::Zb => "ZB",
            Exchange::Binance => "BINANCE",
            Exchange::Okex => "OKEX",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ParseExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HUOBI" => Ok(Exchange::Huobi),
            "ZB" => Ok(Exchange::Zb),
            "BINANCE" => Ok(Exchange::Binance),
            "OKEX" => Ok(Exchange::Okex),
            _ => Err(ParseExchangeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("huobi".parse::<Exchange>().unwrap(), Exchange::Huobi);
        assert_eq!("ZB".parse::<Exchange>().unwrap(), Exchange::Zb);
        assert!("nyse".parse::<Exchange>().is_err());
    }
}
