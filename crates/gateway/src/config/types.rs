use chrono::TimeDelta;
use meridian_core::Exchange;
use meridian_order_manager::OrphanPolicy;
use meridian_transport::{ReconnectPolicy, TransportConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one gateway instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway name, used as `gateway_name` on every object it publishes
    pub name: String,
    pub exchange: Exchange,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub rest_url: String,
    pub market_ws_url: String,
    pub trade_ws_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Symbols streamed as ticks after connect
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Symbols additionally aggregated into one-minute bars
    #[serde(default)]
    pub bar_symbols: Vec<String>,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub orphan_retention: OrphanConfig,
    /// Query the account every this many timer events
    #[serde(default = "default_account_poll_ticks")]
    pub account_poll_ticks: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectMode {
    #[default]
    Immediate,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub mode: ReconnectMode,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            mode: ReconnectMode::Immediate,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        match self.mode {
            ReconnectMode::Immediate => ReconnectPolicy::Immediate,
            ReconnectMode::Exponential => ReconnectPolicy::Exponential {
                initial: Duration::from_millis(self.initial_delay_ms),
                max: Duration::from_millis(self.max_delay_ms),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanConfig {
    #[serde(default = "default_orphan_max_age_ms")]
    pub max_age_ms: u64,
    #[serde(default = "default_orphan_max_entries")]
    pub max_entries: usize,
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            max_age_ms: default_orphan_max_age_ms(),
            max_entries: default_orphan_max_entries(),
        }
    }
}

impl OrphanConfig {
    pub fn policy(&self) -> OrphanPolicy {
        OrphanPolicy {
            max_age: TimeDelta::milliseconds(i64::try_from(self.max_age_ms).unwrap_or(i64::MAX)),
            max_entries: self.max_entries,
        }
    }
}

impl GatewayConfig {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::default()
            .with_heartbeat(Duration::from_millis(self.heartbeat_interval_ms))
            .with_reconnect(self.reconnect.policy())
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_retention.policy()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_ms() -> u64 {
    60_000
}

fn default_account_poll_ticks() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_orphan_max_age_ms() -> u64 {
    300_000
}

fn default_orphan_max_entries() -> usize {
    10_000
}
