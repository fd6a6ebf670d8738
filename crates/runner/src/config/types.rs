use meridian_event::DEFAULT_TIMER_INTERVAL;
use meridian_gateway::GatewayConfig;
use meridian_recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,
    /// Recording is off when absent
    #[serde(default)]
    pub recorder: Option<RecorderConfig>,
    /// `EnvFilter` directives; `RUST_LOG` wins when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_timer_interval_ms")]
    pub timer_interval_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timer_interval_ms: default_timer_interval_ms(),
        }
    }
}

impl EngineSettings {
    pub fn timer_interval(&self) -> Duration {
        Duration::from_millis(self.timer_interval_ms)
    }
}

pub(crate) fn default_log_filter() -> String {
    "meridian=info".to_string()
}

fn default_timer_interval_ms() -> u64 {
    DEFAULT_TIMER_INTERVAL.as_millis() as u64
}
