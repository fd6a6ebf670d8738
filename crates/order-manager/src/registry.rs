//! Order identity registry
//!
//! Maps locally generated order ids to exchange-assigned ids and keeps the
//! canonical [`Order`] per local id. Pushes that reference an exchange id
//! nobody has bound yet are parked in an [`OrphanBuffer`] and replayed, in
//! arrival order, the moment the binding is made.

use chrono::{Local, Utc};
use meridian_core::{LocalOrderId, Order, OrderStatus, Timestamp, Trade};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::orphan::{OrphanBuffer, OrphanPolicy};
use crate::update::{self, OrderUpdate};

/// Receives every order change and every new fill
///
/// Called while the registry lock is held, so implementations must not
/// call back into the registry.
pub trait OrderListener: Send + Sync {
    fn on_order(&self, order: &Order);

    fn on_trade(&self, trade: &Trade);
}

/// Result of an `apply_update` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Folded into the order (which may have been unchanged by it)
    Applied,
    /// No binding yet, held for replay
    Buffered,
    /// Order already terminal, update discarded
    IgnoredTerminal,
}

struct Inner {
    orders: HashMap<LocalOrderId, Order>,
    by_exchange: HashMap<String, LocalOrderId>,
    orphans: OrphanBuffer,
    trade_seq: u64,
}

pub struct OrderIdentityRegistry {
    gateway_name: String,
    /// Process start stamp, keeps ids unique across restarts
    session: String,
    next_id: AtomicU64,
    inner: Mutex<Inner>,
    listener: Arc<dyn OrderListener>,
}

impl OrderIdentityRegistry {
    pub fn new(gateway_name: impl Into<String>, listener: Arc<dyn OrderListener>) -> Self {
        Self::with_policy(gateway_name, listener, OrphanPolicy::default())
    }

    pub fn with_policy(
        gateway_name: impl Into<String>,
        listener: Arc<dyn OrderListener>,
        policy: OrphanPolicy,
    ) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            session: Local::now().format("%y%m%d%H%M%S").to_string(),
            next_id: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                orders: HashMap::new(),
                by_exchange: HashMap::new(),
                orphans: OrphanBuffer::new(policy),
                trade_seq: 0,
            }),
            listener,
        }
    }

    pub fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    /// Fresh local id; strictly increasing within this registry
    pub fn new_local_id(&self) -> LocalOrderId {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        LocalOrderId(format!("{}{:08}", self.session, seq))
    }

    /// Store (or replace) the canonical order for its local id and publish it.
    ///
    /// A finished order is never replaced, and a replacement never moves
    /// status or traded volume backwards. An order that already carries an
    /// exchange id is bound, and any updates buffered for that id are
    /// replayed onto it.
    pub fn on_order(&self, mut order: Order) {
        let mut inner = self.inner.lock();
        let local_id = order.local_id.clone();

        if let Some(existing) = inner.orders.get(&local_id) {
            if existing.status.is_terminal() {
                debug!(%local_id, status = ?existing.status, "Ignoring snapshot of finished order");
                return;
            }
            order.traded = order.traded.max(existing.traded);
            if existing.status.progress() > order.status.progress() {
                order.status = existing.status;
            }
            if order.exchange_id.is_none() {
                order.exchange_id = existing.exchange_id.clone();
            }
        }
        let exchange_id = order.exchange_id.clone();

        self.listener.on_order(&order);
        inner.orders.insert(local_id.clone(), order);

        if let Some(exchange_id) = exchange_id {
            match inner.by_exchange.get(&exchange_id) {
                Some(bound) if *bound != local_id => {
                    warn!(%exchange_id, %bound, %local_id, "Exchange id already bound elsewhere");
                    return;
                }
                Some(_) => {}
                None => {
                    inner.by_exchange.insert(exchange_id.clone(), local_id.clone());
                }
            }
            self.replay(&mut inner, &exchange_id, &local_id);
        }
    }

    /// Record that the exchange knows `local_id` as `exchange_id`.
    ///
    /// Buffered updates for `exchange_id` are applied immediately, oldest
    /// first; returns how many were replayed. Binding the same pair again
    /// is a no-op.
    pub fn bind_exchange_id(&self, local_id: &LocalOrderId, exchange_id: &str) -> Result<usize> {
        let mut inner = self.inner.lock();
        let Some(order) = inner.orders.get(local_id) else {
            return Err(RegistryError::OrderNotFound(local_id.clone()));
        };

        if let Some(bound) = inner.by_exchange.get(exchange_id) {
            if bound == local_id {
                return Ok(0);
            }
            return Err(RegistryError::ExchangeIdConflict {
                exchange_id: exchange_id.to_string(),
                bound: bound.to_string(),
                requested: local_id.to_string(),
            });
        }
        if let Some(existing) = order.exchange_id.as_deref() {
            if existing != exchange_id {
                return Err(RegistryError::ExchangeIdConflict {
                    exchange_id: existing.to_string(),
                    bound: local_id.to_string(),
                    requested: local_id.to_string(),
                });
            }
        }

        inner
            .by_exchange
            .insert(exchange_id.to_string(), local_id.clone());
        if let Some(order) = inner.orders.get_mut(local_id) {
            order.exchange_id = Some(exchange_id.to_string());
            self.listener.on_order(order);
        }
        debug!(%local_id, exchange_id, "Bound exchange id");

        Ok(self.replay(&mut inner, exchange_id, local_id))
    }

    /// Apply an exchange push, or buffer it when the id is not bound yet
    pub fn apply_update(&self, exchange_id: &str, update: OrderUpdate) -> ApplyOutcome {
        self.apply_update_at(exchange_id, update, Utc::now())
    }

    /// `apply_update` with an explicit receive time for the orphan buffer
    pub fn apply_update_at(
        &self,
        exchange_id: &str,
        update: OrderUpdate,
        received: Timestamp,
    ) -> ApplyOutcome {
        let mut inner = self.inner.lock();
        let bound = inner
            .by_exchange
            .get(exchange_id)
            .filter(|local_id| inner.orders.contains_key(*local_id))
            .cloned();

        match bound {
            Some(local_id) => self.apply_locked(&mut inner, &local_id, &update),
            None => {
                debug!(exchange_id, "No binding yet, buffering update");
                inner.orphans.push(exchange_id, update, received);
                ApplyOutcome::Buffered
            }
        }
    }

    /// Apply an update addressed by local id (REST acknowledgements)
    pub fn update_local(&self, local_id: &LocalOrderId, update: OrderUpdate) -> Result<ApplyOutcome> {
        let mut inner = self.inner.lock();
        if !inner.orders.contains_key(local_id) {
            return Err(RegistryError::OrderNotFound(local_id.clone()));
        }
        Ok(self.apply_locked(&mut inner, local_id, &update))
    }

    /// Mark an order the exchange refused as `Rejected`
    pub fn reject(&self, local_id: &LocalOrderId, reason: &str) -> Result<ApplyOutcome> {
        warn!(gateway = %self.gateway_name, %local_id, reason, "Order rejected");
        self.update_local(local_id, OrderUpdate::new().status(OrderStatus::Rejected))
    }

    pub fn get_by_local(&self, local_id: &LocalOrderId) -> Option<Order> {
        self.inner.lock().orders.get(local_id).cloned()
    }

    /// `None` until the exchange id is bound
    pub fn get_by_exchange(&self, exchange_id: &str) -> Option<Order> {
        let inner = self.inner.lock();
        let local_id = inner.by_exchange.get(exchange_id)?;
        inner.orders.get(local_id).cloned()
    }

    /// Order for `local_id`, or `OrderNotFound`
    pub fn require(&self, local_id: &LocalOrderId) -> Result<Order> {
        self.get_by_local(local_id)
            .ok_or_else(|| RegistryError::OrderNotFound(local_id.clone()))
    }

    /// Local id bound to `exchange_id`, minting and binding a new one for
    /// orders this session did not place
    pub fn local_id_for_exchange(&self, exchange_id: &str) -> LocalOrderId {
        let mut inner = self.inner.lock();
        if let Some(local_id) = inner.by_exchange.get(exchange_id) {
            return local_id.clone();
        }
        let local_id = self.new_local_id();
        inner
            .by_exchange
            .insert(exchange_id.to_string(), local_id.clone());
        local_id
    }

    pub fn exchange_id_for(&self, local_id: &LocalOrderId) -> Option<String> {
        self.inner
            .lock()
            .orders
            .get(local_id)
            .and_then(|order| order.exchange_id.clone())
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.inner
            .lock()
            .orders
            .values()
            .filter(|order| order.is_active())
            .cloned()
            .collect()
    }

    pub fn orphan_count(&self) -> usize {
        self.inner.lock().orphans.len()
    }

    /// Apply the age bound of the orphan policy; returns how many were dropped
    pub fn evict_orphans(&self, now: Timestamp) -> usize {
        let dropped = self.inner.lock().orphans.evict_expired(now);
        if dropped > 0 {
            info!(gateway = %self.gateway_name, dropped, "Evicted expired order updates");
        }
        dropped
    }

    fn replay(&self, inner: &mut Inner, exchange_id: &str, local_id: &LocalOrderId) -> usize {
        let pending = inner.orphans.take(exchange_id);
        let count = pending.len();
        for update in pending {
            self.apply_locked(inner, local_id, &update);
        }
        if count > 0 {
            debug!(exchange_id, %local_id, count, "Replayed buffered updates");
        }
        count
    }

    fn apply_locked(
        &self,
        inner: &mut Inner,
        local_id: &LocalOrderId,
        update: &OrderUpdate,
    ) -> ApplyOutcome {
        let Some(order) = inner.orders.get_mut(local_id) else {
            return ApplyOutcome::IgnoredTerminal;
        };
        if order.status.is_terminal() {
            debug!(%local_id, status = ?order.status, "Ignoring update for finished order");
            return ApplyOutcome::IgnoredTerminal;
        }

        let effect = update::apply(order, update);
        if !effect.changed {
            return ApplyOutcome::Applied;
        }

        let order = order.clone();
        if let Some(volume) = effect.filled {
            inner.trade_seq += 1;
            let trade = Trade {
                trade_id: update
                    .trade_id
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}", order.local_id, inner.trade_seq)),
                local_id: order.local_id.clone(),
                symbol: order.symbol.clone(),
                exchange: order.exchange,
                direction: order.direction,
                price: update.fill_price.unwrap_or(order.price),
                volume,
                datetime: update.datetime.unwrap_or(order.datetime),
                gateway_name: self.gateway_name.clone(),
            };
            self.listener.on_trade(&trade);
        }
        self.listener.on_order(&order);
        ApplyOutcome::Applied
    }
}
