//! Task status change errors.

use opsledger_shared::AppError;
use thiserror::Error;

use super::types::TaskStatus;

/// Errors raised by the task status guard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The caller is not the task's assignee.
    #[error("only the assignee may update this task")]
    NotAssignee,

    /// The caller's role may not set this status.
    #[error("you may not move a task to {0}")]
    StatusNotAllowed(TaskStatus),
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_forbidden() {
        assert_eq!(AppError::from(TaskError::NotAssignee).status_code(), 403);
        let err = AppError::from(TaskError::StatusNotAllowed(TaskStatus::Done));
        assert_eq!(err.status_code(), 403);
        assert!(err.to_string().contains("DONE"));
    }
}
