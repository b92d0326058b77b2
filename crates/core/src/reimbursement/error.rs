//! Reimbursement transition errors.

use opsledger_shared::AppError;
use thiserror::Error;

use super::types::ReimbursementStatus;

/// Errors raised by the reimbursement transition guard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The current status does not allow the requested transition.
    #[error("cannot move reimbursement from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ReimbursementStatus,
        /// The attempted target status.
        to: ReimbursementStatus,
    },

    /// A rejection needs a non-empty reason.
    #[error("rejection reason is required")]
    RejectionReasonRequired,
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            TransitionError::RejectionReasonRequired => {
                Self::field("rejectionReason", err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_is_conflict() {
        let err = TransitionError::InvalidTransition {
            from: ReimbursementStatus::Paid,
            to: ReimbursementStatus::Approved,
        };
        assert_eq!(err.to_string(), "cannot move reimbursement from PAID to APPROVED");
        assert_eq!(AppError::from(err).status_code(), 409);
    }

    #[test]
    fn test_missing_reason_is_validation() {
        let err = AppError::from(TransitionError::RejectionReasonRequired);
        assert_eq!(err.status_code(), 400);
        match err {
            AppError::Validation { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "rejectionReason");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
