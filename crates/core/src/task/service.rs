//! Task status guard.

use uuid::Uuid;

use super::error::TaskError;
use super::types::TaskStatus;
use crate::access::{Principal, Role};

/// Decides whether a status change is allowed.
pub struct TaskService;

impl TaskService {
    /// Checks that `principal` may move a task assigned to `assignee` to `target`.
    ///
    /// Employees may only report progress (`IN_PROGRESS`, `SUBMITTED`) on
    /// their own tasks. Other roles are limited only by row visibility.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::StatusNotAllowed` or `TaskError::NotAssignee`.
    pub fn check_status_change(
        principal: &Principal,
        assignee: Uuid,
        target: TaskStatus,
    ) -> Result<(), TaskError> {
        if principal.role != Role::Employees {
            return Ok(());
        }
        if !target.is_reportable_by_assignee() {
            return Err(TaskError::StatusNotAllowed(target));
        }
        if assignee != principal.user_id {
            return Err(TaskError::NotAssignee);
        }
        Ok(())
    }
}
