//! The surface every exchange adapter exposes

use async_trait::async_trait;
use meridian_core::{
    CancelRequest, CanonicalSymbol, Exchange, LocalOrderId, OrderRequest, SubscribeRequest,
};
use meridian_event::EventEngine;
use std::sync::Arc;

use crate::adapters::huobi::HuobiGateway;
use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// One connection to one exchange account
///
/// Everything a gateway learns is published on the event engine; these
/// methods only start work. Order outcomes arrive as `order` events, never
/// as errors from `send_order`.
#[async_trait]
pub trait Gateway: Send + Sync {
    fn name(&self) -> &str;

    fn exchange(&self) -> Exchange;

    /// Discover contracts, account and open orders, then start streaming
    async fn connect(&self) -> Result<(), GatewayError>;

    async fn subscribe_ticks(&self, symbol: &CanonicalSymbol) -> Result<(), GatewayError>;

    /// Stream ticks for `symbol` and aggregate them into one-minute bars
    async fn subscribe_bars(&self, symbol: &CanonicalSymbol) -> Result<(), GatewayError>;

    async fn subscribe(&self, request: &SubscribeRequest) -> Result<(), GatewayError> {
        if request.bars {
            self.subscribe_bars(&request.symbol).await
        } else {
            self.subscribe_ticks(&request.symbol).await
        }
    }

    /// Register the order locally and return its id at once; the exchange
    /// round trip happens in the background
    async fn send_order(&self, request: &OrderRequest) -> Result<LocalOrderId, GatewayError>;

    async fn cancel_order(&self, request: &CancelRequest) -> Result<(), GatewayError>;

    async fn query_account(&self) -> Result<(), GatewayError>;

    /// Stop streaming and timers. Idempotent.
    async fn close(&self);
}

/// Build the adapter for `config.exchange`
pub fn create_gateway(
    config: GatewayConfig,
    engine: Arc<EventEngine>,
) -> Result<Arc<dyn Gateway>, GatewayError> {
    config.validate()?;
    match config.exchange {
        Exchange::Huobi => Ok(Arc::new(HuobiGateway::new(config, engine)?)),
        other => Err(GatewayError::UnsupportedExchange(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(exchange: &str) -> GatewayConfig {
        serde_json::from_str(&format!(
            r#"{{
                "name": "{exchange}",
                "exchange": "{exchange}",
                "rest_url": "https://api.example.com",
                "market_ws_url": "wss://api.example.com/ws",
                "trade_ws_url": "wss://api.example.com/ws/v1"
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_factory_builds_huobi() {
        let engine = Arc::new(EventEngine::new(Duration::from_secs(1)));
        let gateway = create_gateway(config("HUOBI"), engine).unwrap();
        assert_eq!(gateway.name(), "HUOBI");
        assert_eq!(gateway.exchange(), Exchange::Huobi);
    }

    #[test]
    fn test_factory_rejects_unknown_exchange() {
        let engine = Arc::new(EventEngine::new(Duration::from_secs(1)));
        let result = create_gateway(config("BINANCE"), engine);
        assert!(matches!(
            result,
            Err(GatewayError::UnsupportedExchange(Exchange::Binance))
        ));
    }
}
