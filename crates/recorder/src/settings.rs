//! Which symbols are recorded, persisted as JSON
//!
//! ```json
//! {
//!   "tick": { "btcusdt.HUOBI": { "symbol": "btcusdt", "exchange": "HUOBI", "gateway_name": "HUOBI" } },
//!   "bar": {}
//! }
//! ```

use meridian_core::{Contract, Exchange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, Result};

/// Default settings file name
pub const SETTINGS_FILE: &str = "data_recorder_setting.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub symbol: String,
    pub exchange: Exchange,
    pub gateway_name: String,
}

impl From<&Contract> for RecordingEntry {
    fn from(contract: &Contract) -> Self {
        Self {
            symbol: contract.symbol.clone(),
            exchange: contract.exchange,
            gateway_name: contract.gateway_name.clone(),
        }
    }
}

/// Recorded symbols keyed by vt_symbol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSettings {
    #[serde(default)]
    pub tick: BTreeMap<String, RecordingEntry>,
    #[serde(default)]
    pub bar: BTreeMap<String, RecordingEntry>,
}

impl RecordingSettings {
    /// Load from `path`; a missing file yields empty settings
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(RecorderError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RecorderError::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| RecorderError::io(path, e))
    }
}

/// Where the recorder keeps its settings and output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from(SETTINGS_FILE)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
