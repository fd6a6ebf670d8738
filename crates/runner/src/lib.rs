//! Meridian Runner
//!
//! Loads a [`RunnerConfig`], starts the event engine, one gateway per enabled
//! config section and (optionally) the recorder, then runs until ctrl-c.
//! Shutdown closes gateways first, then the recorder, then the engine.

pub mod app;
pub mod config;

pub use app::{Runtime, subscribe_requests};
pub use config::{
    ConfigError, EngineSettings, RunnerConfig, load_config, load_config_from_str,
    load_default_config,
};
