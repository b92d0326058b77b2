//! Reimbursement transition guard.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::TransitionError;
use super::types::{ReimbursementAction, ReimbursementStatus};

/// Stateless guard for reimbursement transitions.
///
/// Each method checks the current status and returns the action to persist,
/// or an error that must abort the operation before any write.
pub struct ReimbursementService;

impl ReimbursementService {
    /// Approve a pending claim.
    ///
    /// # Errors
    /// `TransitionError::InvalidTransition` unless the claim is PENDING.
    pub fn approve(
        current: ReimbursementStatus,
        approved_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ReimbursementAction, TransitionError> {
        match current {
            ReimbursementStatus::Pending => Ok(ReimbursementAction::Approve {
                approved_by,
                approved_at: now,
            }),
            _ => Err(TransitionError::InvalidTransition {
                from: current,
                to: ReimbursementStatus::Approved,
            }),
        }
    }

    /// Reject a pending claim.
    ///
    /// The reason is checked first, so a blank reason fails validation
    /// whatever the current status is.
    ///
    /// # Errors
    /// `TransitionError::RejectionReasonRequired` if the reason is blank,
    /// `TransitionError::InvalidTransition` unless the claim is PENDING.
    pub fn reject(
        current: ReimbursementStatus,
        approved_by: Uuid,
        rejection_reason: &str,
    ) -> Result<ReimbursementAction, TransitionError> {
        let rejection_reason = rejection_reason.trim();
        if rejection_reason.is_empty() {
            return Err(TransitionError::RejectionReasonRequired);
        }

        match current {
            ReimbursementStatus::Pending => Ok(ReimbursementAction::Reject {
                approved_by,
                rejection_reason: rejection_reason.to_string(),
            }),
            _ => Err(TransitionError::InvalidTransition {
                from: current,
                to: ReimbursementStatus::Rejected,
            }),
        }
    }

    /// Mark an approved claim as paid.
    ///
    /// # Errors
    /// `TransitionError::InvalidTransition` unless the claim is APPROVED.
    pub fn mark_paid(
        current: ReimbursementStatus,
        now: DateTime<Utc>,
    ) -> Result<ReimbursementAction, TransitionError> {
        match current {
            ReimbursementStatus::Approved => Ok(ReimbursementAction::MarkPaid { paid_at: now }),
            _ => Err(TransitionError::InvalidTransition {
                from: current,
                to: ReimbursementStatus::Paid,
            }),
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: ReimbursementStatus, to: ReimbursementStatus) -> bool {
        matches!(
            (from, to),
            (
                ReimbursementStatus::Pending,
                ReimbursementStatus::Approved | ReimbursementStatus::Rejected
            ) | (ReimbursementStatus::Approved, ReimbursementStatus::Paid)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_pending() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let action = ReimbursementService::approve(ReimbursementStatus::Pending, user, now).unwrap();
        assert_eq!(
            action,
            ReimbursementAction::Approve {
                approved_by: user,
                approved_at: now
            }
        );
    }

    #[test]
    fn test_approve_rejected_fails() {
        let err =
            ReimbursementService::approve(ReimbursementStatus::Rejected, Uuid::new_v4(), Utc::now())
                .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: ReimbursementStatus::Rejected,
                to: ReimbursementStatus::Approved
            }
        );
    }

    #[test]
    fn test_approve_paid_fails() {
        assert!(
            ReimbursementService::approve(ReimbursementStatus::Paid, Uuid::new_v4(), Utc::now())
                .is_err()
        );
    }

    #[test]
    fn test_reject_trims_reason() {
        let user = Uuid::new_v4();
        let action =
            ReimbursementService::reject(ReimbursementStatus::Pending, user, "  no receipt ")
                .unwrap();
        assert_eq!(
            action,
            ReimbursementAction::Reject {
                approved_by: user,
                rejection_reason: "no receipt".to_string()
            }
        );
    }

    #[test]
    fn test_reject_blank_reason() {
        assert_eq!(
            ReimbursementService::reject(ReimbursementStatus::Pending, Uuid::new_v4(), "   "),
            Err(TransitionError::RejectionReasonRequired)
        );
    }

    #[test]
    fn test_reject_approved_fails() {
        assert!(matches!(
            ReimbursementService::reject(ReimbursementStatus::Approved, Uuid::new_v4(), "late"),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_mark_paid_approved() {
        let now = Utc::now();
        assert_eq!(
            ReimbursementService::mark_paid(ReimbursementStatus::Approved, now),
            Ok(ReimbursementAction::MarkPaid { paid_at: now })
        );
    }

    #[test]
    fn test_mark_paid_pending_fails() {
        assert!(matches!(
            ReimbursementService::mark_paid(ReimbursementStatus::Pending, Utc::now()),
            Err(TransitionError::InvalidTransition {
                from: ReimbursementStatus::Pending,
                to: ReimbursementStatus::Paid
            })
        ));
    }

    #[test]
    fn test_valid_transitions() {
        use ReimbursementStatus::{Approved, Paid, Pending, Rejected};
        assert!(ReimbursementService::is_valid_transition(Pending, Approved));
        assert!(ReimbursementService::is_valid_transition(Pending, Rejected));
        assert!(ReimbursementService::is_valid_transition(Approved, Paid));
        assert!(!ReimbursementService::is_valid_transition(Pending, Paid));
        assert!(!ReimbursementService::is_valid_transition(Rejected, Approved));
        assert!(!ReimbursementService::is_valid_transition(Paid, Pending));
    }
}
