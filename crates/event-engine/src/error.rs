//! Event engine errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Event engine has been stopped")]
    Shutdown,

    #[error("Event engine is already running")]
    AlreadyRunning,

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}
