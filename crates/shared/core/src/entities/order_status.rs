use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Active statuses only ever move forward
/// (`Submitting -> NotTraded -> PartiallyTraded -> AllTraded`);
/// `Cancelled` and `Rejected` end the lifecycle from any active status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Sent (or about to be sent), no acknowledgement yet
    Submitting,
    /// Accepted by the exchange, nothing filled
    NotTraded,
    PartiallyTraded,
    AllTraded,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::AllTraded | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Returns true if the order is still working
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Position along the forward path; terminal statuses rank highest
    pub fn progress(&self) -> u8 {
        match self {
            OrderStatus::Submitting => 0,
            OrderStatus::NotTraded => 1,
            OrderStatus::PartiallyTraded => 2,
            OrderStatus::AllTraded | OrderStatus::Cancelled | OrderStatus::Rejected => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::AllTraded.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Submitting.is_active());
        assert!(OrderStatus::PartiallyTraded.is_active());
    }

    #[test]
    fn test_progress_is_ordered() {
        assert!(OrderStatus::Submitting.progress() < OrderStatus::NotTraded.progress());
        assert!(OrderStatus::NotTraded.progress() < OrderStatus::PartiallyTraded.progress());
        assert!(OrderStatus::PartiallyTraded.progress() < OrderStatus::AllTraded.progress());
    }
}
