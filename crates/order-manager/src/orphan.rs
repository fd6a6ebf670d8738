//! Buffer for updates that arrive before their exchange id is bound

use chrono::TimeDelta;
use meridian_core::Timestamp;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

use crate::update::OrderUpdate;

/// Retention bounds for unbound updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanPolicy {
    /// Updates older than this are dropped by `evict_expired`
    pub max_age: TimeDelta,
    /// Total updates held across all exchange ids; the oldest go first
    pub max_entries: usize,
}

impl Default for OrphanPolicy {
    fn default() -> Self {
        Self {
            max_age: TimeDelta::minutes(5),
            max_entries: 10_000,
        }
    }
}

#[derive(Debug)]
struct Orphan {
    seq: u64,
    received: Timestamp,
    update: OrderUpdate,
}

/// Per exchange id queues plus one global arrival queue for eviction.
///
/// Entries taken by `take` leave stale markers in `arrival`; they are
/// skipped when they reach the front.
#[derive(Debug)]
pub(crate) struct OrphanBuffer {
    policy: OrphanPolicy,
    by_exchange: HashMap<String, VecDeque<Orphan>>,
    arrival: VecDeque<(u64, String)>,
    next_seq: u64,
    len: usize,
}

impl OrphanBuffer {
    pub fn new(policy: OrphanPolicy) -> Self {
        Self {
            policy,
            by_exchange: HashMap::new(),
            arrival: VecDeque::new(),
            next_seq: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn pending_for(&self, exchange_id: &str) -> usize {
        self.by_exchange.get(exchange_id).map_or(0, VecDeque::len)
    }

    pub fn push(&mut self, exchange_id: &str, update: OrderUpdate, received: Timestamp) {
        if self.policy.max_entries == 0 {
            warn!(exchange_id, "Orphan buffer disabled, dropping update");
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_exchange
            .entry(exchange_id.to_string())
            .or_default()
            .push_back(Orphan {
                seq,
                received,
                update,
            });
        self.arrival.push_back((seq, exchange_id.to_string()));
        self.len += 1;

        while self.len > self.policy.max_entries {
            if self.pop_oldest(None).is_none() {
                break;
            }
        }
    }

    /// Remove and return every update held for `exchange_id`, oldest first
    pub fn take(&mut self, exchange_id: &str) -> Vec<OrderUpdate> {
        let Some(queue) = self.by_exchange.remove(exchange_id) else {
            return Vec::new();
        };
        self.len -= queue.len();
        if self.len == 0 {
            self.arrival.clear();
        }
        queue.into_iter().map(|orphan| orphan.update).collect()
    }

    /// Drop updates received before `now - max_age`; returns how many
    pub fn evict_expired(&mut self, now: Timestamp) -> usize {
        let cutoff = now - self.policy.max_age;
        let mut dropped = 0;
        while self.pop_oldest(Some(cutoff)).is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Drop the oldest live entry, only if it was received before `cutoff`
    /// when one is given
    fn pop_oldest(&mut self, cutoff: Option<Timestamp>) -> Option<String> {
        while let Some((seq, exchange_id)) = self.arrival.front() {
            let Some(queue) = self.by_exchange.get_mut(exchange_id) else {
                self.arrival.pop_front();
                continue;
            };
            let live = queue.front().is_some_and(|orphan| orphan.seq == *seq);
            if !live {
                self.arrival.pop_front();
                continue;
            }
            if let (Some(cutoff), Some(oldest)) = (cutoff, queue.front()) {
                if oldest.received >= cutoff {
                    return None;
                }
            }

            queue.pop_front();
            if queue.is_empty() {
                self.by_exchange.remove(exchange_id);
            }
            let (_, exchange_id) = self.arrival.pop_front()?;
            self.len -= 1;
            warn!(exchange_id = %exchange_id, "Dropping unbound order update");
            return Some(exchange_id);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meridian_core::OrderStatus;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_take_returns_arrival_order() {
        let mut buffer = OrphanBuffer::new(OrphanPolicy::default());
        buffer.push("X", OrderUpdate::new().cumulative(dec!(1)), at(0));
        buffer.push("Y", OrderUpdate::new().cumulative(dec!(5)), at(1));
        buffer.push("X", OrderUpdate::new().cumulative(dec!(2)), at(2));

        let updates = buffer.take("X");
        assert_eq!(
            updates,
            vec![
                OrderUpdate::new().cumulative(dec!(1)),
                OrderUpdate::new().cumulative(dec!(2)),
            ]
        );
        assert_eq!(buffer.len(), 1);
        assert!(buffer.take("X").is_empty());
    }

    #[test]
    fn test_count_bound_drops_oldest_first() {
        let policy = OrphanPolicy {
            max_entries: 2,
            ..Default::default()
        };
        let mut buffer = OrphanBuffer::new(policy);
        buffer.push("A", OrderUpdate::new().status(OrderStatus::NotTraded), at(0));
        buffer.push("B", OrderUpdate::new().status(OrderStatus::NotTraded), at(1));
        buffer.push("C", OrderUpdate::new().status(OrderStatus::NotTraded), at(2));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pending_for("A"), 0);
        assert_eq!(buffer.pending_for("B"), 1);
        assert_eq!(buffer.pending_for("C"), 1);
    }

    #[test]
    fn test_age_bound() {
        let policy = OrphanPolicy {
            max_age: TimeDelta::seconds(60),
            ..Default::default()
        };
        let mut buffer = OrphanBuffer::new(policy);
        buffer.push("A", OrderUpdate::new(), at(0));
        buffer.push("B", OrderUpdate::new(), at(30));
        buffer.push("A", OrderUpdate::new(), at(50));

        assert_eq!(buffer.evict_expired(at(70)), 1);
        assert_eq!(buffer.pending_for("A"), 1);
        assert_eq!(buffer.pending_for("B"), 1);

        assert_eq!(buffer.evict_expired(at(200)), 2);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_stale_markers_are_skipped() {
        let policy = OrphanPolicy {
            max_entries: 2,
            ..Default::default()
        };
        let mut buffer = OrphanBuffer::new(policy);
        buffer.push("A", OrderUpdate::new(), at(0));
        buffer.push("B", OrderUpdate::new(), at(1));
        buffer.take("A");

        buffer.push("A", OrderUpdate::new(), at(2));
        buffer.push("C", OrderUpdate::new(), at(3));

        // B was the oldest live entry
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pending_for("B"), 0);
        assert_eq!(buffer.pending_for("A"), 1);
        assert_eq!(buffer.pending_for("C"), 1);
    }
}
