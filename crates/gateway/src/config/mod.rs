//! Gateway settings, deserialized from the runner's JSON config

pub mod types;

pub use types::{GatewayConfig, OrphanConfig, ReconnectConfig, ReconnectMode};

use crate::error::GatewayError;

impl GatewayConfig {
    /// Reject settings that cannot produce a working gateway
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::Config("gateway name is empty".into()));
        }
        for (field, value) in [
            ("rest_url", &self.rest_url),
            ("market_ws_url", &self.market_ws_url),
            ("trade_ws_url", &self.trade_ws_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| GatewayError::Config(format!("{}: invalid {field}: {e}", self.name)))?;
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(GatewayError::Config(format!(
                "{}: heartbeat_interval_ms must be positive",
                self.name
            )));
        }
        if self.account_poll_ticks == 0 {
            return Err(GatewayError::Config(format!(
                "{}: account_poll_ticks must be positive",
                self.name
            )));
        }
        if self.reconnect.mode == ReconnectMode::Exponential
            && (self.reconnect.initial_delay_ms == 0
                || self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms)
        {
            return Err(GatewayError::Config(format!(
                "{}: exponential reconnect needs 0 < initial_delay_ms <= max_delay_ms",
                self.name
            )));
        }
        if let Some(symbol) = self.bar_symbols.iter().find(|s| !self.symbols.contains(s)) {
            return Err(GatewayError::Config(format!(
                "{}: bar symbol {symbol} is not in symbols",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Exchange;
    use meridian_transport::ReconnectPolicy;
    use std::time::Duration;

    const MINIMAL: &str = r#"{
        "name": "HUOBI",
        "exchange": "HUOBI",
        "rest_url": "https://api.huobi.pro",
        "market_ws_url": "wss://api.huobi.pro/ws",
        "trade_ws_url": "wss://api.huobi.pro/ws/v1",
        "symbols": ["btcusdt"]
    }"#;

    #[test]
    fn test_defaults() {
        let config: GatewayConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.exchange, Exchange::Huobi);
        assert!(config.enabled);
        assert_eq!(config.account_poll_ticks, 3);
        assert_eq!(config.reconnect.policy(), ReconnectPolicy::Immediate);
        assert_eq!(config.orphan_policy().max_entries, 10_000);
        assert_eq!(
            config.transport_config().heartbeat_interval,
            Duration::from_secs(60)
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_exponential_reconnect() {
        let mut config: GatewayConfig = serde_json::from_str(MINIMAL).unwrap();
        config.reconnect = serde_json::from_str(
            r#"{"mode": "exponential", "initial_delay_ms": 100, "max_delay_ms": 800}"#,
        )
        .unwrap();
        assert_eq!(
            config.transport_config().reconnect,
            ReconnectPolicy::Exponential {
                initial: Duration::from_millis(100),
                max: Duration::from_millis(800),
            }
        );

        config.reconnect.initial_delay_ms = 0;
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_bar_symbol_must_be_streamed() {
        let mut config: GatewayConfig = serde_json::from_str(MINIMAL).unwrap();
        config.bar_symbols = vec!["ethusdt".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        let mut config: GatewayConfig = serde_json::from_str(MINIMAL).unwrap();
        config.market_ws_url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
