//! Process wiring: engine, gateways and recorder, started and stopped in order

use anyhow::Context;
use meridian_core::{CanonicalSymbol, SubscribeRequest};
use meridian_event::EventEngine;
use meridian_gateway::{Gateway, GatewayConfig, create_gateway};
use meridian_recorder::{JsonLinesSink, RecorderConfig, RecorderEngine, RecorderSubscription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::config::RunnerConfig;

/// Engine, gateways and recorder of one process; stop with [`Runtime::shutdown`]
pub struct Runtime {
    engine: Arc<EventEngine>,
    gateways: HashMap<String, Arc<dyn Gateway>>,
    recorder: Option<RecorderEngine>,
    subscriptions: Option<UnboundedReceiver<RecorderSubscription>>,
}

impl Runtime {
    /// Start the engine, build every enabled gateway and the recorder.
    /// Nothing connects yet.
    pub fn start(config: &RunnerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let engine = Arc::new(EventEngine::new(config.engine.timer_interval()));
        engine.start().context("starting event engine")?;

        let mut gateways = HashMap::new();
        for gateway_config in config.enabled_gateways() {
            let gateway = create_gateway(gateway_config.clone(), Arc::clone(&engine))
                .with_context(|| format!("building gateway {}", gateway_config.name))?;
            info!(gateway = %gateway_config.name, exchange = %gateway_config.exchange, "Gateway created");
            gateways.insert(gateway_config.name.clone(), gateway);
        }

        let (recorder, subscriptions) = match &config.recorder {
            Some(recorder_config) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let recorder = start_recorder(&engine, recorder_config, tx)?;
                (Some(recorder), Some(rx))
            }
            None => (None, None),
        };

        Ok(Self {
            engine,
            gateways,
            recorder,
            subscriptions,
        })
    }

    pub fn engine(&self) -> &Arc<EventEngine> {
        &self.engine
    }

    pub fn gateway(&self, name: &str) -> Option<&Arc<dyn Gateway>> {
        self.gateways.get(name)
    }

    pub fn recorder(&self) -> Option<&RecorderEngine> {
        self.recorder.as_ref()
    }

    /// Connect each gateway and subscribe its configured symbols. A gateway
    /// that fails to connect is logged and left out.
    pub async fn connect_all(&self, config: &RunnerConfig) {
        for gateway_config in config.enabled_gateways() {
            let Some(gateway) = self.gateways.get(&gateway_config.name) else {
                continue;
            };
            if let Err(e) = gateway.connect().await {
                warn!(gateway = %gateway_config.name, error = %e, "Gateway failed to connect");
                continue;
            }
            for request in subscribe_requests(gateway_config) {
                if let Err(e) = gateway.subscribe(&request).await {
                    warn!(gateway = %gateway_config.name, symbol = %request.symbol, error = %e, "Subscribe failed");
                }
            }
        }
    }

    /// Serve recorder subscription requests until ctrl-c
    pub async fn run_until_shutdown(&mut self) -> anyhow::Result<()> {
        let mut subscriptions = self.subscriptions.take();
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("waiting for ctrl-c")?;
                    info!("Shutdown requested");
                    return Ok(());
                }
                Some(subscription) = next_subscription(&mut subscriptions) => {
                    self.route(subscription).await;
                }
            }
        }
    }

    async fn route(&self, subscription: RecorderSubscription) {
        let RecorderSubscription {
            gateway_name,
            request,
        } = subscription;
        match self.gateways.get(&gateway_name) {
            Some(gateway) => {
                if let Err(e) = gateway.subscribe(&request).await {
                    warn!(gateway = %gateway_name, symbol = %request.symbol, error = %e, "Recorder subscribe failed");
                }
            }
            None => warn!(gateway = %gateway_name, symbol = %request.symbol, "Recorder asked for unknown gateway"),
        }
    }

    /// Close gateways, then the recorder, then the engine
    pub async fn shutdown(mut self) {
        for (name, gateway) in self.gateways.drain() {
            gateway.close().await;
            info!(gateway = %name, "Gateway closed");
        }
        if let Some(recorder) = self.recorder.take() {
            recorder.close();
        }
        self.engine.stop();
        info!("Engine stopped");
    }
}

async fn next_subscription(
    rx: &mut Option<UnboundedReceiver<RecorderSubscription>>,
) -> Option<RecorderSubscription> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

fn start_recorder(
    engine: &Arc<EventEngine>,
    config: &RecorderConfig,
    subscriptions: mpsc::UnboundedSender<RecorderSubscription>,
) -> anyhow::Result<RecorderEngine> {
    let sink = JsonLinesSink::new(&config.output_dir)
        .with_context(|| format!("opening recorder output {}", config.output_dir.display()))?;
    let recorder = RecorderEngine::start(
        Arc::clone(engine),
        &config.settings_path,
        Box::new(sink),
        Some(subscriptions),
    )
    .context("starting recorder")?;
    Ok(recorder)
}

/// Tick subscriptions for every configured symbol, bars where requested
pub fn subscribe_requests(config: &GatewayConfig) -> Vec<SubscribeRequest> {
    config
        .symbols
        .iter()
        .map(|symbol| SubscribeRequest {
            symbol: CanonicalSymbol::new(symbol.clone(), config.exchange),
            bars: config.bar_symbols.contains(symbol),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_default_config;

    #[test]
    fn test_subscribe_requests_mark_bar_symbols() {
        let config = load_default_config().unwrap();
        let huobi = config.get_gateway("HUOBI").unwrap();
        let requests = subscribe_requests(huobi);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].symbol.symbol(), "btcusdt");
        assert!(requests[0].bars);
        assert_eq!(requests[1].symbol.symbol(), "ethusdt");
        assert!(!requests[1].bars);
    }

    #[tokio::test]
    async fn test_runtime_builds_enabled_gateways_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load_default_config().unwrap();
        config.engine.timer_interval_ms = 50;
        config.recorder = Some(RecorderConfig {
            settings_path: dir.path().join("settings.json"),
            output_dir: dir.path().join("data"),
        });

        let runtime = Runtime::start(&config).unwrap();
        assert!(runtime.engine().is_running());
        assert!(runtime.gateway("HUOBI").is_some());
        assert!(runtime.gateway("BINANCE").is_none());
        assert!(runtime.recorder().is_some());

        let engine = Arc::clone(runtime.engine());
        runtime.shutdown().await;
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_runtime_rejects_invalid_config() {
        let mut config = load_default_config().unwrap();
        config.gateways.iter_mut().for_each(|g| g.enabled = false);
        assert!(Runtime::start(&config).is_err());
    }
}
