//! Error types for the recorder

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No contract known for {0}")]
    UnknownContract(String),

    #[error("Failed to spawn recorder worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Recorder is closed")]
    Closed,
}

impl RecorderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecorderError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
