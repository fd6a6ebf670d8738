use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::values::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Diagnostic message published on the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub msg: String,
    pub level: LogLevel,
    pub time: Timestamp,
    pub source: String,
}

impl LogRecord {
    pub fn new(source: impl Into<String>, level: LogLevel, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            level,
            time: Utc::now(),
            source: source.into(),
        }
    }

    pub fn info(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(source, LogLevel::Info, msg)
    }

    pub fn warn(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(source, LogLevel::Warn, msg)
    }
}
