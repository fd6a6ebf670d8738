//! Transport configuration

use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// What the receive loop does between a lost connection and the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Reconnect at once, forever
    #[default]
    Immediate,
    /// Double the delay after each failed attempt, capped at `max`.
    /// Resets to `initial` after a successful connect.
    Exponential { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    pub(crate) fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            next: match self {
                ReconnectPolicy::Immediate => Duration::ZERO,
                ReconnectPolicy::Exponential { initial, .. } => *initial,
            },
        }
    }
}

#[derive(Debug)]
pub(crate) struct Backoff {
    policy: ReconnectPolicy,
    next: Duration,
}

impl Backoff {
    pub(crate) fn next_delay(&mut self) -> Duration {
        match self.policy {
            ReconnectPolicy::Immediate => Duration::ZERO,
            ReconnectPolicy::Exponential { max, .. } => {
                let delay = self.next.min(max);
                self.next = self.next.saturating_mul(2).min(max);
                delay
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = self.policy.backoff();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Spacing of outbound ping frames
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect: ReconnectPolicy::Immediate,
        }
    }
}

impl TransportConfig {
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}
