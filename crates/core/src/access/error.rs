//! Access control errors.

use opsledger_shared::AppError;
use thiserror::Error;

use super::policy::Operation;
use super::role::Role;

/// Errors raised when a principal may not act.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The role is not in the operation's allow-list.
    #[error("role {role} may not perform {operation:?}")]
    RoleNotAllowed {
        /// Caller's role.
        role: Role,
        /// Attempted operation.
        operation: Operation,
    },

    /// The record exists but lies outside the caller's visibility scope.
    #[error("{0} is outside your access scope")]
    OutOfScope(&'static str),

    /// The token carries a role the system does not know.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UnknownRole(_) => Self::Unauthorized(err.to_string()),
            AccessError::RoleNotAllowed { .. } | AccessError::OutOfScope(_) => {
                Self::Forbidden(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_forbidden() {
        let err = AccessError::RoleNotAllowed {
            role: Role::Employees,
            operation: Operation::InvoiceCreate,
        };
        assert_eq!(AppError::from(err).status_code(), 403);
        assert_eq!(
            AppError::from(AccessError::OutOfScope("reimbursement")).status_code(),
            403
        );
    }

    #[test]
    fn test_unknown_role_is_unauthorized() {
        assert_eq!(
            AppError::from(AccessError::UnknownRole("guest".into())).status_code(),
            401
        );
    }
}
