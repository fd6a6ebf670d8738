//! Connection state, counters and the last-frame diagnostics

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest frame excerpt kept for error reports, in characters
pub const DIAGNOSTIC_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Stopped,
}

/// Last frame sent and received, truncated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub last_sent: Option<String>,
    pub last_received: Option<String>,
}

impl Diagnostics {
    pub(crate) fn record_sent(&mut self, text: &str) {
        self.last_sent = Some(truncate(text));
    }

    pub(crate) fn record_received(&mut self, text: &str) {
        self.last_received = Some(truncate(text));
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "last sent: {} | last received: {}",
            self.last_sent.as_deref().unwrap_or("-"),
            self.last_received.as_deref().unwrap_or("-")
        )
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(DIAGNOSTIC_LIMIT) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub connect_attempts: AtomicU64,
    pub connects: AtomicU64,
    pub frames_received: AtomicU64,
    pub frames_sent: AtomicU64,
    pub frames_dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub connect_attempts: u64,
    pub connects: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    /// Sends attempted while no connection was live
    pub frames_dropped: u64,
}

impl TransportStats {
    /// Attempts after the first one
    pub fn reconnect_attempts(&self) -> u64 {
        self.connect_attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_long_frames() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.record_received(&"x".repeat(1500));
        assert_eq!(diagnostics.last_received.as_ref().map(|s| s.len()), Some(1000));

        diagnostics.record_sent("short");
        assert_eq!(diagnostics.last_sent.as_deref(), Some("short"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "é".repeat(1200);
        assert_eq!(truncate(&text).chars().count(), DIAGNOSTIC_LIMIT);
    }

    #[test]
    fn test_reconnect_attempts() {
        let stats = TransportStats {
            connect_attempts: 4,
            ..Default::default()
        };
        assert_eq!(stats.reconnect_attempts(), 3);
        assert_eq!(TransportStats::default().reconnect_attempts(), 0);
    }
}
