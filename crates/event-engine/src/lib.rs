//! Meridian Event Engine
//!
//! The single in-memory bus every component publishes onto and consumes
//! from. One dispatch thread drains an unbounded queue and invokes the
//! handlers registered for each event's type, then the general handlers.
//! A second thread injects a `timer` event at a fixed interval.
//!
//! ```text
//!  producers (gateways, timer) ──put──► [ unbounded queue ] ──► dispatch thread
//!                                                                   │
//!                                              handlers[event.kind] ┤ (registration order)
//!                                              general handlers     ┘
//! ```
//!
//! Delivery is best effort: nothing is persisted, and events still queued
//! when `stop()` is called may be discarded.

pub mod engine;
pub mod error;
pub mod event;
mod registry;

pub use engine::{DEFAULT_TIMER_INTERVAL, EventEngine};
pub use error::EngineError;
pub use event::{
    EVENT_ACCOUNT, EVENT_BAR, EVENT_CONTRACT, EVENT_LOG, EVENT_ORDER, EVENT_TICK, EVENT_TIMER,
    EVENT_TRADE, Event, EventData, Handler, handler, keyed,
};
