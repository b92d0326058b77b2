//! Reimbursement domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reimbursement status.
///
/// Valid transitions:
/// - Pending → Approved (approve)
/// - Pending → Rejected (reject)
/// - Approved → Paid (mark paid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReimbursementStatus {
    /// Submitted and awaiting a decision.
    #[default]
    Pending,
    /// Approved and awaiting payment.
    Approved,
    /// Rejected with a reason (terminal).
    Rejected,
    /// Paid out (terminal).
    Paid,
}

impl ReimbursementStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Paid];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Paid => "PAID",
        }
    }

    /// Parses a status from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Paid)
    }
}

impl fmt::Display for ReimbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permitted transition with the fields it stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReimbursementAction {
    /// Pending → Approved.
    Approve {
        /// Who approved.
        approved_by: Uuid,
        /// When.
        approved_at: DateTime<Utc>,
    },
    /// Pending → Rejected.
    Reject {
        /// Who rejected.
        approved_by: Uuid,
        /// Why (non-empty, trimmed).
        rejection_reason: String,
    },
    /// Approved → Paid.
    MarkPaid {
        /// When the payout happened.
        paid_at: DateTime<Utc>,
    },
}

impl ReimbursementAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> ReimbursementStatus {
        match self {
            Self::Approve { .. } => ReimbursementStatus::Approved,
            Self::Reject { .. } => ReimbursementStatus::Rejected,
            Self::MarkPaid { .. } => ReimbursementStatus::Paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(ReimbursementStatus::Pending.as_str(), "PENDING");
        assert_eq!(ReimbursementStatus::Approved.as_str(), "APPROVED");
        assert_eq!(ReimbursementStatus::Rejected.as_str(), "REJECTED");
        assert_eq!(ReimbursementStatus::Paid.as_str(), "PAID");
    }

    #[test]
    fn test_status_parse() {
        for status in ReimbursementStatus::ALL {
            assert_eq!(ReimbursementStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            ReimbursementStatus::parse("approved"),
            Some(ReimbursementStatus::Approved)
        );
        assert_eq!(ReimbursementStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ReimbursementStatus::Pending.is_terminal());
        assert!(!ReimbursementStatus::Approved.is_terminal());
        assert!(ReimbursementStatus::Rejected.is_terminal());
        assert!(ReimbursementStatus::Paid.is_terminal());
    }

    #[test]
    fn test_action_new_status() {
        let now = Utc::now();
        let user = Uuid::nil();
        assert_eq!(
            ReimbursementAction::Approve {
                approved_by: user,
                approved_at: now
            }
            .new_status(),
            ReimbursementStatus::Approved
        );
        assert_eq!(
            ReimbursementAction::Reject {
                approved_by: user,
                rejection_reason: "duplicate".to_string()
            }
            .new_status(),
            ReimbursementStatus::Rejected
        );
        assert_eq!(
            ReimbursementAction::MarkPaid { paid_at: now }.new_status(),
            ReimbursementStatus::Paid
        );
    }
}
