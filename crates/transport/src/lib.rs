//! Meridian Transport
//!
//! A streaming client that keeps one logical WebSocket connection alive
//! for an exchange adapter. The adapter supplies a [`Connector`] (where to
//! connect) and a [`StreamHandler`] (how to decode and react to frames);
//! the transport owns everything else:
//!
//! - a receive loop: connect, read, hand frames to the handler, and on any
//!   failure tear the socket down and connect again per [`ReconnectPolicy`]
//! - a heartbeat loop: an outbound ping every `heartbeat_interval`
//! - a fire-and-forget send path ([`TransportSender`]) that drops frames
//!   while no connection is live
//! - diagnostics: the last frame sent and received, for error reports

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod handler;
pub mod sender;
pub mod transport;
pub mod ws;

pub use config::{DEFAULT_HEARTBEAT_INTERVAL, ReconnectPolicy, TransportConfig};
pub use connection::{Connection, Connector, Frame, FrameReader, FrameWriter};
pub use diagnostics::{ConnectionState, DIAGNOSTIC_LIMIT, Diagnostics, TransportStats};
pub use error::TransportError;
pub use handler::{StreamHandler, decode_json};
pub use sender::{SendStatus, TransportSender};
pub use transport::StreamingTransport;
pub use ws::WsConnector;
