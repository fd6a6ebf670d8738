//! Meridian Gateway
//!
//! The generic gateway pattern plus the exchange adapters built on it:
//!
//! ```text
//!  exchange REST ──► RestTransport (+ RequestSigner) ─┐
//!                                                    ├─► adapter ─► GatewayContext ─► EventEngine
//!  exchange WS ───► StreamingTransport ─► handler ───┘      │            (tick, bar, order, trade,
//!                                                           │             account, contract, log)
//!                                                   TickBook / BarAggregator / OrderIdentityRegistry
//! ```
//!
//! Adapters own their working state (ticks, symbol names, order ids); no
//! state is shared between two gateway instances.

pub mod adapters;
pub mod bar;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod rest;
pub mod ticks;

pub use adapters::HuobiGateway;
pub use bar::{BarAggregator, window_start};
pub use config::{GatewayConfig, OrphanConfig, ReconnectConfig, ReconnectMode};
pub use context::GatewayContext;
pub use error::{GatewayError, ProtocolError, RestError};
pub use gateway::{Gateway, create_gateway};
pub use rest::{
    DEFAULT_REQUEST_TIMEOUT, HttpRestClient, NoSigning, RequestSigner, RestRequest, RestTransport,
};
pub use ticks::TickBook;
