//! Project routes, including membership management.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::{delete, get},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_core::totals::ContractUtilization;
use opsledger_db::ProjectRepository;
use opsledger_db::entities::{projects, sea_orm_active_enums::ProjectStatus};
use opsledger_db::repositories::{
    CreateProjectInput, ProjectDetail, ProjectMember, UpdateProjectInput,
};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, non_negative_amount, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::views::{Deleted, UserRef};

/// Creates the project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{id}/members", get(list_members).post(add_member))
        .route("/projects/{id}/members/{user_id}", delete(remove_member))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing projects.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListProjectsQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Matches name or client.
    pub search: Option<String>,
}

/// Request body for creating a project.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Project name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: String,
    /// Client.
    #[validate(length(max = 200))]
    pub client_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Agreed contract value.
    #[validate(custom(function = "non_negative_amount"))]
    pub contract_value: Option<Decimal>,
    /// Lifecycle state; PLANNING when absent.
    pub status: Option<ProjectStatus>,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date, not before the start.
    pub end_date: Option<NaiveDate>,
}

/// Request body for a partial project update; `null` clears a field.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: Option<String>,
    /// Client.
    #[serde(default, deserialize_with = "double_option")]
    pub client_name: Option<Option<String>>,
    /// Description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// Contract value.
    #[serde(default, deserialize_with = "double_option")]
    pub contract_value: Option<Option<Decimal>>,
    /// Lifecycle state.
    pub status: Option<ProjectStatus>,
    /// Start date.
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    /// End date.
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
}

/// Request body for adding a member.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// User to add.
    pub user_id: Uuid,
    /// Role inside the project; `member` when absent.
    #[validate(custom(function = "not_blank"), length(max = 50))]
    pub role: Option<String>,
}

impl From<CreateProjectRequest> for CreateProjectInput {
    fn from(req: CreateProjectRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            client_name: req.client_name,
            description: req.description,
            contract_value: req.contract_value,
            status: req.status,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

impl From<UpdateProjectRequest> for UpdateProjectInput {
    fn from(req: UpdateProjectRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            client_name: req.client_name.into(),
            description: req.description.into(),
            contract_value: req.contract_value.into(),
            status: req.status,
            start_date: req.start_date.into(),
            end_date: req.end_date.into(),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A project.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    /// Project ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Client.
    pub client_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Contract value.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub contract_value: Option<Decimal>,
    /// Lifecycle state.
    pub status: ProjectStatus,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date.
    pub end_date: Option<NaiveDate>,
    /// Creator.
    pub created_by_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<projects::Model> for ProjectResponse {
    fn from(project: projects::Model) -> Self {
        Self {
            id: project.id,
            name: project.name,
            client_name: project.client_name,
            description: project.description,
            contract_value: project.contract_value,
            status: project.status,
            start_date: project.start_date,
            end_date: project.end_date,
            created_by_id: project.created_by_id,
            created_at: project.created_at.with_timezone(&Utc),
            updated_at: project.updated_at.with_timezone(&Utc),
        }
    }
}

/// A project member.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    /// Member user ID.
    pub user_id: Uuid,
    /// Role inside the project.
    pub role: String,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
    /// The user, if still present.
    pub user: Option<UserRef>,
}

impl From<ProjectMember> for MemberResponse {
    fn from(member: ProjectMember) -> Self {
        Self {
            user_id: member.membership.user_id,
            role: member.membership.role,
            joined_at: member.membership.joined_at.with_timezone(&Utc),
            user: member.user.map(UserRef::from),
        }
    }
}

/// A project with members and contract usage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailResponse {
    /// The project.
    #[serde(flatten)]
    pub project: ProjectResponse,
    /// Members.
    pub members: Vec<MemberResponse>,
    /// Invoiced income against the contract value, when one is set.
    pub utilization: Option<ContractUtilization>,
}

impl From<ProjectDetail> for ProjectDetailResponse {
    fn from(detail: ProjectDetail) -> Self {
        Self {
            project: detail.project.into(),
            members: detail.members.into_iter().map(MemberResponse::from).collect(),
            utilization: detail.utilization,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/projects`
async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListProjectsQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectList)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let result = ProjectRepository::new((*state.db).clone())
        .list(auth.principal(), query.search.as_deref(), page)
        .await?;
    Ok(ctx.page(result.map(ProjectResponse::from)))
}

/// POST `/projects`
/// The creator joins as `owner`.
async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectCreate)?;

    let project = ProjectRepository::new((*state.db).clone())
        .create(auth.user_id(), payload.into(), ctx.now)
        .await?;
    Ok(ctx.created(ProjectResponse::from(project)))
}

/// GET `/projects/{id}`
async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectView)?;

    let detail = ProjectRepository::new((*state.db).clone())
        .find_one(auth.principal(), id)
        .await?;
    Ok(ctx.ok(ProjectDetailResponse::from(detail)))
}

/// PATCH `/projects/{id}`
async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectUpdate)?;

    let project = ProjectRepository::new((*state.db).clone())
        .update(auth.principal(), id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.ok(ProjectResponse::from(project)))
}

/// DELETE `/projects/{id}`
/// Linked invoices and claims keep their rows with the project cleared.
async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectDelete)?;

    ProjectRepository::new((*state.db).clone()).delete(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

/// GET `/projects/{id}/members`
async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectView)?;

    let members = ProjectRepository::new((*state.db).clone())
        .list_members(auth.principal(), id)
        .await?;
    let body: Vec<MemberResponse> = members.into_iter().map(MemberResponse::from).collect();
    Ok(ctx.ok(body))
}

/// POST `/projects/{id}/members`
async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AddMemberRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectManageMembers)?;

    let member = ProjectRepository::new((*state.db).clone())
        .add_member(
            auth.principal(),
            id,
            payload.user_id,
            payload.role.map(|r| r.trim().to_string()),
            ctx.now,
        )
        .await?;
    Ok(ctx.created(MemberResponse::from(member)))
}

/// DELETE `/projects/{id}/members/{user_id}`
async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectManageMembers)?;

    ProjectRepository::new((*state.db).clone())
        .remove_member(auth.principal(), id, user_id)
        .await?;
    Ok(ctx.ok(Deleted { id: user_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use opsledger_core::invoice::Patch;
    use rust_decimal_macros::dec;

    use crate::routes::test_support::{request, send};

    #[test]
    fn test_update_request_patches() {
        let req: UpdateProjectRequest = serde_json::from_str(
            r#"{"contractValue": 5000000, "endDate": null, "status": "ON_HOLD"}"#,
        )
        .unwrap();
        let input = UpdateProjectInput::from(req);

        assert_eq!(input.contract_value, Patch::Set(dec!(5000000)));
        assert_eq!(input.end_date, Patch::Clear);
        assert_eq!(input.start_date, Patch::Keep);
        assert_eq!(input.status, Some(ProjectStatus::OnHold));
    }

    #[test]
    fn test_project_response_shape() {
        let now = Utc::now().fixed_offset();
        let response = ProjectResponse::from(projects::Model {
            id: Uuid::new_v4(),
            name: "Website".to_string(),
            client_name: None,
            description: None,
            contract_value: Some(dec!(1500000.5)),
            status: ProjectStatus::Planning,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: None,
            created_by_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["contractValue"].to_string(), "1500000.5");
        assert_eq!(json["status"], "PLANNING");
        assert_eq!(json["startDate"], "2024-01-01");
    }

    #[tokio::test]
    async fn test_employee_cannot_create_project() {
        let response = send(request(
            "POST",
            "/api/projects",
            Some(Role::Employees),
            Some(r#"{"name": "Internal tools"}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_finance_cannot_manage_members() {
        let uri = format!("/api/projects/{}/members/{}", Uuid::new_v4(), Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Finance), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_negative_contract_value() {
        let response = send(request(
            "POST",
            "/api/projects",
            Some(Role::ProjectManager),
            Some(r#"{"name": "Audit", "contractValue": -1}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
