//! Task routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_core::task::{TaskPriority, TaskStatus};
use opsledger_db::TaskRepository;
use opsledger_db::entities::tasks;
use opsledger_db::repositories::{CreateTaskInput, TaskDetail, TaskFilter, UpdateTaskInput};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::views::{Deleted, NamedRef, UserRef};

/// Creates the task routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{id}/tasks",
            get(list_project_tasks).post(create_task),
        )
        .route("/tasks", get(list_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/status", patch(update_status))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Only this project; ignored under `/projects/{id}/tasks`.
    pub project_id: Option<Uuid>,
    /// Only this status.
    pub status: Option<TaskStatus>,
    /// Only tasks assigned to this user.
    pub assigned_to_id: Option<Uuid>,
}

impl ListTasksQuery {
    fn page(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.size.unwrap_or(10))
    }

    fn filter(&self) -> TaskFilter {
        TaskFilter {
            project_id: self.project_id,
            status: self.status,
            assigned_to: self.assigned_to_id,
        }
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    /// Description.
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// MEDIUM when absent.
    pub priority: Option<TaskPriority>,
    /// TODO when absent.
    pub status: Option<TaskStatus>,
    /// Assignee.
    pub assigned_to_id: Uuid,
    /// Deadline.
    pub deadline: DateTime<Utc>,
}

/// Request body for a partial task update; `null` clears the description.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// New title.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// Priority.
    pub priority: Option<TaskPriority>,
    /// Status.
    pub status: Option<TaskStatus>,
    /// New assignee.
    pub assigned_to_id: Option<Uuid>,
    /// New deadline.
    pub deadline: Option<DateTime<Utc>>,
}

/// Request body for a status change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskStatusRequest {
    /// Target status.
    pub status: TaskStatus,
}

impl From<CreateTaskRequest> for CreateTaskInput {
    fn from(req: CreateTaskRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: req.description,
            priority: req.priority,
            status: req.status,
            assigned_to: req.assigned_to_id,
            deadline: req.deadline,
        }
    }
}

impl From<UpdateTaskRequest> for UpdateTaskInput {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description.into(),
            priority: req.priority,
            status: req.status,
            assigned_to: req.assigned_to_id,
            deadline: req.deadline,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    /// Task ID.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Assignee.
    pub assigned_to_id: Uuid,
    /// Creator.
    pub created_by_id: Uuid,
    /// Deadline.
    pub deadline: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<tasks::Model> for TaskResponse {
    fn from(task: tasks::Model) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status.into(),
            priority: task.priority.into(),
            assigned_to_id: task.assigned_to_id,
            created_by_id: task.created_by_id,
            deadline: task.deadline.with_timezone(&Utc),
            created_at: task.created_at.with_timezone(&Utc),
            updated_at: task.updated_at.with_timezone(&Utc),
        }
    }
}

/// A task with its project and assignee.
#[derive(Debug, Serialize)]
pub struct TaskDetailResponse {
    /// The task.
    #[serde(flatten)]
    pub task: TaskResponse,
    /// Project.
    pub project: Option<NamedRef>,
    /// Assignee.
    pub assignee: Option<UserRef>,
}

impl From<TaskDetail> for TaskDetailResponse {
    fn from(detail: TaskDetail) -> Self {
        Self {
            task: detail.task.into(),
            project: detail.project.map(NamedRef::from),
            assignee: detail.assignee.map(UserRef::from),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/projects/{id}/tasks`
async fn list_project_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(project_id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskList)?;

    let filter = TaskFilter {
        project_id: Some(project_id),
        ..query.filter()
    };
    let result = TaskRepository::new((*state.db).clone())
        .list(auth.principal(), filter, query.page())
        .await?;
    Ok(ctx.page(result.map(TaskResponse::from)))
}

/// POST `/projects/{id}/tasks`
async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(project_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskCreate)?;

    let task = TaskRepository::new((*state.db).clone())
        .create(auth.principal(), project_id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.created(TaskResponse::from(task)))
}

/// GET `/tasks`
/// Employees only see tasks assigned to them.
async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskList)?;

    let result = TaskRepository::new((*state.db).clone())
        .list(auth.principal(), query.filter(), query.page())
        .await?;
    Ok(ctx.page(result.map(TaskResponse::from)))
}

/// GET `/tasks/{id}`
async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskView)?;

    let detail = TaskRepository::new((*state.db).clone())
        .find_one(auth.principal(), id)
        .await?;
    Ok(ctx.ok(TaskDetailResponse::from(detail)))
}

/// PATCH `/tasks/{id}`
async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskUpdate)?;

    let task = TaskRepository::new((*state.db).clone())
        .update(auth.principal(), id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.ok(TaskResponse::from(task)))
}

/// PATCH `/tasks/{id}/status`
/// Employees may only report IN_PROGRESS or SUBMITTED on their own tasks.
async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTaskStatusRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskUpdateStatus)?;

    let task = TaskRepository::new((*state.db).clone())
        .update_status(auth.principal(), id, payload.status, ctx.now)
        .await?;
    Ok(ctx.ok(TaskResponse::from(task)))
}

/// DELETE `/tasks/{id}`
async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaskDelete)?;

    TaskRepository::new((*state.db).clone())
        .delete(auth.principal(), id)
        .await?;
    Ok(ctx.ok(Deleted { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use opsledger_core::invoice::Patch;

    use crate::routes::test_support::{request, send};

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest = serde_json::from_str(&format!(
            r#"{{"title": "  Draft report ", "assignedToId": "{}", "deadline": "2026-11-01T00:00:00Z"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        let input = CreateTaskInput::from(req);

        assert_eq!(input.title, "Draft report");
        assert_eq!(input.priority, None);
        assert_eq!(input.status, None);
    }

    #[test]
    fn test_update_request_clears_description() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"description": null, "priority": "URGENT"}"#).unwrap();
        let input = UpdateTaskInput::from(req);

        assert_eq!(input.description, Patch::Clear);
        assert_eq!(input.priority, Some(TaskPriority::Urgent));
        assert!(input.title.is_none());
    }

    #[tokio::test]
    async fn test_employee_cannot_create_task() {
        let uri = format!("/api/projects/{}/tasks", Uuid::new_v4());
        let body = format!(
            r#"{{"title": "Fix", "assignedToId": "{}", "deadline": "2026-11-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        let response = send(request("POST", &uri, Some(Role::Employees), Some(&body))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let uri = format!("/api/projects/{}/tasks", Uuid::new_v4());
        let body = format!(
            r#"{{"title": "   ", "assignedToId": "{}", "deadline": "2026-11-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        let response = send(request("POST", &uri, Some(Role::ProjectManager), Some(&body))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let uri = format!("/api/tasks/{}/status", Uuid::new_v4());
        let response = send(request(
            "PATCH",
            &uri,
            Some(Role::Employees),
            Some(r#"{"status": "ARCHIVED"}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_finance_cannot_delete_task() {
        let uri = format!("/api/tasks/{}", Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Finance), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_oversized_page_is_rejected() {
        let response = send(request(
            "GET",
            "/api/tasks?size=500",
            Some(Role::Employees),
            None,
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tasks_require_authentication() {
        let response = send(request("GET", "/api/tasks", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
