//! Exchange adapters
//!
//! Each adapter maps one exchange's REST and WebSocket protocol onto the
//! canonical objects and implements [`crate::Gateway`].

pub mod huobi;

pub use huobi::HuobiGateway;
