//! Message lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a message sits in its delivery lifecycle.
///
/// Transitions are monotonic: `Pending` is the only non-terminal state, and
/// every other variant is terminal (no further transition is permitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Awaiting its scheduled delivery instant.
    Pending,
    /// Delivered successfully.
    Sent,
    /// The channel backend reached and rejected the content during approval.
    FailedApprove,
    /// The channel backend was unreachable, or replied unintelligibly,
    /// during approval.
    CrashedApprove,
    /// The channel backend reached and rejected the content during delivery.
    FailedDeliver,
    /// The channel backend was unreachable, or replied unintelligibly,
    /// during delivery.
    CrashedDeliver,
    /// Cancelled by the caller before it was dispatched.
    Cancelled,
}

impl Status {
    /// Whether this status permits no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::FailedApprove => "failed-approve",
            Self::CrashedApprove => "crashed-approve",
            Self::FailedDeliver => "failed-deliver",
            Self::CrashedDeliver => "crashed-deliver",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!Status::Pending.is_terminal());
        for terminal in [
            Status::Sent,
            Status::FailedApprove,
            Status::CrashedApprove,
            Status::FailedDeliver,
            Status::CrashedDeliver,
            Status::Cancelled,
        ] {
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&Status::FailedApprove).unwrap();
        assert_eq!(json, "\"failed-approve\"");
    }
}
