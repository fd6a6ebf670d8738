//! Meridian Recorder
//!
//! Subscribes to `tick`, `bar` and `contract` events and persists the
//! symbols listed in `data_recorder_setting.json`:
//!
//! ```text
//! contract ──► remember, ask the owning gateway to subscribe (optional channel)
//! tick/bar ──► recorded? ──► queue ──► worker thread ──► RecordSink
//! ```
//!
//! Which symbols to record is decided here, never by the gateways.

pub mod engine;
pub mod error;
pub mod settings;
pub mod sink;

pub use engine::{RecorderEngine, RecorderSubscription};
pub use error::{RecorderError, Result};
pub use settings::{RecorderConfig, RecordingEntry, RecordingSettings, SETTINGS_FILE};
pub use sink::{JsonLinesSink, RecordSink};
