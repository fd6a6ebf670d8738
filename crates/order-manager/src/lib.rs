//! Meridian Order Manager
//!
//! Reconciles order identities across the gap between sending an order
//! and the exchange acknowledging it:
//!
//! ```text
//! send_order ──► new_local_id ──► on_order (Submitting) ──► REST ──► bind_exchange_id
//!                                                                        │
//! exchange push ──► apply_update(exchange_id) ──┬─ bound ──► fold into Order ──► listener
//!                                               └─ unbound ─► OrphanBuffer ──┘ (replayed on bind)
//! ```
//!
//! Every mutation goes through one lock per registry, so local-id minting,
//! binding and update application are serialized.

pub mod error;
pub mod orphan;
pub mod registry;
pub mod update;

pub use error::{RegistryError, Result};
pub use orphan::OrphanPolicy;
pub use registry::{ApplyOutcome, OrderIdentityRegistry, OrderListener};
pub use update::{OrderUpdate, TradedVolume};
