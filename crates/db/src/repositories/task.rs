//! Task repository.
//!
//! Every read and write goes through the task visibility condition: managers
//! see tasks in their own projects, employees only tasks assigned to them.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::access::{AccessError, Principal, Resource, scope};
use opsledger_core::invoice::Patch;
use opsledger_core::task::{self, TaskPriority, TaskService, TaskStatus};
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::{projects, tasks, users};
use crate::visibility::{project_condition, task_condition};

/// Error types for task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Task not found.
    #[error("Task not found: {0}")]
    NotFound(Uuid),

    /// Project not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Assignee not found.
    #[error("User not found: {0}")]
    AssigneeNotFound(Uuid),

    /// The caller may not make this status change.
    #[error(transparent)]
    Status(#[from] task::TaskError),

    /// Caller may not see the task or its project.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(_) | TaskError::ProjectNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            TaskError::AssigneeNotFound(_) => Self::field("assignedToId", err.to_string()),
            TaskError::Status(e) => e.into(),
            TaskError::Access(e) => e.into(),
            TaskError::Database(e) => {
                error!(error = %e, "task query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Priority (MEDIUM when absent).
    pub priority: Option<TaskPriority>,
    /// Initial status (TODO when absent).
    pub status: Option<TaskStatus>,
    /// User the task is assigned to.
    pub assigned_to: Uuid,
    /// Deadline.
    pub deadline: DateTime<Utc>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    /// New title.
    pub title: Option<String>,
    /// Description.
    pub description: Patch<String>,
    /// New priority.
    pub priority: Option<TaskPriority>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New assignee.
    pub assigned_to: Option<Uuid>,
    /// New deadline.
    pub deadline: Option<DateTime<Utc>>,
}

/// Optional list filters, applied on top of the caller's scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    /// Only tasks of this project.
    pub project_id: Option<Uuid>,
    /// Only tasks in this status.
    pub status: Option<TaskStatus>,
    /// Only tasks assigned to this user.
    pub assigned_to: Option<Uuid>,
}

impl TaskFilter {
    fn apply(self, scope_condition: Condition) -> Condition {
        let mut condition = Condition::all().add(scope_condition);
        if let Some(project_id) = self.project_id {
            condition = condition.add(tasks::Column::ProjectId.eq(project_id));
        }
        if let Some(status) = self.status {
            let status: crate::entities::sea_orm_active_enums::TaskStatus = status.into();
            condition = condition.add(tasks::Column::Status.eq(status));
        }
        if let Some(user) = self.assigned_to {
            condition = condition.add(tasks::Column::AssignedToId.eq(user));
        }
        condition
    }
}

/// A task with its project and assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    /// The task.
    pub task: tasks::Model,
    /// Owning project.
    pub project: Option<projects::Model>,
    /// Assignee.
    pub assignee: Option<users::Model>,
}

/// Task repository.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    db: DatabaseConnection,
}

impl TaskRepository {
    /// Creates a new task repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a task inside a project visible to `principal`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound`, `Access`, `AssigneeNotFound`, or a database error.
    pub async fn create(
        &self,
        principal: &Principal,
        project_id: Uuid,
        input: CreateTaskInput,
        now: DateTime<Utc>,
    ) -> Result<tasks::Model, TaskError> {
        visible_project(&self.db, principal, project_id).await?;
        ensure_user(&self.db, input.assigned_to).await?;

        let timestamp = now.into();
        let task = tasks::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            title: Set(input.title),
            description: Set(input.description),
            status: Set(input.status.unwrap_or_default().into()),
            priority: Set(input.priority.unwrap_or_default().into()),
            assigned_to_id: Set(input.assigned_to),
            created_by_id: Set(principal.user_id),
            deadline: Set(input.deadline.into()),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(
            task_id = %task.id,
            project_id = %project_id,
            assigned_to = %task.assigned_to_id,
            "task created"
        );
        Ok(task)
    }

    /// Lists tasks visible to `principal`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: TaskFilter,
        page: PageRequest,
    ) -> Result<PageResponse<tasks::Model>, TaskError> {
        let page = page.normalized();
        let condition = filter.apply(task_condition(scope(principal, Resource::Task)));

        let total = tasks::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = tasks::Entity::find()
            .filter(condition)
            .order_by_desc(tasks::Column::CreatedAt)
            .order_by_desc(tasks::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Loads a task with its project and assignee.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access` when out of scope, or a database error.
    pub async fn find_one(&self, principal: &Principal, id: Uuid) -> Result<TaskDetail, TaskError> {
        let txn = self.db.begin().await?;

        let task = visible_task(&txn, principal, id).await?;
        let project = projects::Entity::find_by_id(task.project_id).one(&txn).await?;
        let assignee = users::Entity::find_by_id(task.assigned_to_id).one(&txn).await?;

        txn.commit().await?;

        Ok(TaskDetail {
            task,
            project,
            assignee,
        })
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `AssigneeNotFound`, or a database error.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        input: UpdateTaskInput,
        now: DateTime<Utc>,
    ) -> Result<tasks::Model, TaskError> {
        let task = visible_task(&self.db, principal, id).await?;
        if let Some(user) = input.assigned_to {
            ensure_user(&self.db, user).await?;
        }

        let description = input.description.apply(task.description.clone());

        let mut active: tasks::ActiveModel = task.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority.into());
        }
        if let Some(status) = input.status {
            active.status = Set(status.into());
        }
        if let Some(user) = input.assigned_to {
            active.assigned_to_id = Set(user);
        }
        if let Some(deadline) = input.deadline {
            active.deadline = Set(deadline.into());
        }
        active.description = Set(description);
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;
        info!(task_id = %id, "task updated");
        Ok(updated)
    }

    /// Moves a task to `status`.
    ///
    /// The row is locked while the guard runs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `Status` when the caller may not set
    /// this status, or a database error.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: Uuid,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<tasks::Model, TaskError> {
        let txn = self.db.begin().await?;

        let task = tasks::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(TaskError::NotFound(id))?;
        check_scope(&txn, principal, id).await?;
        TaskService::check_status_change(principal, task.assigned_to_id, status)?;

        let from = TaskStatus::from(task.status);
        let mut active: tasks::ActiveModel = task.into();
        active.status = Set(status.into());
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(task_id = %id, from = %from, to = %status, "task status changed");
        Ok(updated)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), TaskError> {
        visible_task(&self.db, principal, id).await?;
        tasks::Entity::delete_by_id(id).exec(&self.db).await?;

        info!(task_id = %id, "task deleted");
        Ok(())
    }
}

/// Finds a task and checks it lies in the caller's scope.
async fn visible_task<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> Result<tasks::Model, TaskError> {
    let task = tasks::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(TaskError::NotFound(id))?;
    check_scope(db, principal, id).await?;
    Ok(task)
}

async fn check_scope<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> Result<(), TaskError> {
    let scope = scope(principal, Resource::Task);
    if !scope.is_unrestricted() {
        let visible = tasks::Entity::find_by_id(id)
            .filter(task_condition(scope))
            .count(db)
            .await?;
        if visible == 0 {
            return Err(AccessError::OutOfScope(Resource::Task.name()).into());
        }
    }
    Ok(())
}

async fn visible_project<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    project_id: Uuid,
) -> Result<(), TaskError> {
    if projects::Entity::find_by_id(project_id).one(db).await?.is_none() {
        return Err(TaskError::ProjectNotFound(project_id));
    }

    let scope = scope(principal, Resource::Project);
    if !scope.is_unrestricted() {
        let visible = projects::Entity::find_by_id(project_id)
            .filter(project_condition(scope))
            .count(db)
            .await?;
        if visible == 0 {
            return Err(AccessError::OutOfScope(Resource::Project.name()).into());
        }
    }
    Ok(())
}

async fn ensure_user<C: ConnectionTrait>(db: &C, user: Uuid) -> Result<(), TaskError> {
    if users::Entity::find_by_id(user).one(db).await?.is_none() {
        return Err(TaskError::AssigneeNotFound(user));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsledger_core::access::Scope;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::from(TaskError::NotFound(Uuid::nil())).status_code(), 404);
        assert_eq!(
            AppError::from(TaskError::AssigneeNotFound(Uuid::nil())).status_code(),
            400
        );
        assert_eq!(
            AppError::from(TaskError::Status(task::TaskError::NotAssignee)).status_code(),
            403
        );
    }

    #[test]
    fn test_filters_are_anded_with_an_any_scope() {
        let manager = Uuid::new_v4();
        let project = Uuid::new_v4();
        let filter = TaskFilter {
            project_id: Some(project),
            ..TaskFilter::default()
        };
        let sql = tasks::Entity::find()
            .filter(filter.apply(task_condition(Scope::ProjectOwnedBy(manager))))
            .build(DbBackend::Postgres)
            .to_string();

        let or_clause = sql.find(" OR ").unwrap();
        let project_clause = sql.find(&project.to_string()).unwrap();
        assert!(sql[or_clause..project_clause].contains(") AND "));
    }

    #[test]
    fn test_filters_narrow_the_scope() {
        let user = Uuid::new_v4();
        let project = Uuid::new_v4();
        let filter = TaskFilter {
            project_id: Some(project),
            status: Some(TaskStatus::Submitted),
            assigned_to: None,
        };
        let condition = filter.apply(task_condition(Scope::AssignedTo(user)));
        let sql = tasks::Entity::find()
            .filter(condition)
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(&user.to_string()));
        assert!(sql.contains(&project.to_string()));
        assert!(sql.contains("SUBMITTED"));
    }
}
