use meridian_gateway::GatewayConfig;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use super::types::RunnerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No enabled gateways in config")]
    NoEnabledGateways,
    #[error("Duplicate gateway name: {0}")]
    DuplicateGateway(String),
    #[error("Timer interval must be positive")]
    InvalidTimerInterval,
}

/// Load runner configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RunnerConfig, ConfigError> {
    let default_config = include_str!("meridian.json");
    load_config_from_str(default_config)
}

impl RunnerConfig {
    /// Get only enabled gateways
    pub fn enabled_gateways(&self) -> Vec<&GatewayConfig> {
        self.gateways.iter().filter(|g| g.enabled).collect()
    }

    /// Get a specific gateway by name
    pub fn get_gateway(&self, name: &str) -> Option<&GatewayConfig> {
        self.gateways.iter().find(|g| g.name == name)
    }

    /// Validate the process-level settings; each gateway validates its own
    /// section when it is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.timer_interval_ms == 0 {
            return Err(ConfigError::InvalidTimerInterval);
        }
        let mut names = HashSet::new();
        for gateway in &self.gateways {
            if !names.insert(gateway.name.as_str()) {
                return Err(ConfigError::DuplicateGateway(gateway.name.clone()));
            }
        }
        if self.enabled_gateways().is_empty() {
            return Err(ConfigError::NoEnabledGateways);
        }
        Ok(())
    }
}
