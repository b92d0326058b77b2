//! Team routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_db::TeamRepository;
use opsledger_db::entities::teams;
use opsledger_db::repositories::{TeamDetail, TeamMember, UpdateTeamInput};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::views::{Deleted, UserRef};

/// Creates the team routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list_teams).post(create_team))
        .route(
            "/teams/{id}",
            get(get_team).patch(update_team).delete(delete_team),
        )
        .route("/teams/{id}/members", post(add_member))
        .route("/teams/{id}/members/{user_id}", delete(remove_member))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing teams.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListTeamsQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Matches the team name.
    pub search: Option<String>,
}

/// Request body for creating a team.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    /// Team name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: String,
    /// Description.
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Request body for a partial team update; `null` clears the description.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Request body for adding a member.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamMemberRequest {
    /// User to add.
    pub user_id: Uuid,
}

impl From<UpdateTeamRequest> for UpdateTeamInput {
    fn from(req: UpdateTeamRequest) -> Self {
        Self {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description.into(),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A team.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    /// Team ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<teams::Model> for TeamResponse {
    fn from(team: teams::Model) -> Self {
        Self {
            id: team.id,
            name: team.name,
            description: team.description,
            created_at: team.created_at.with_timezone(&Utc),
            updated_at: team.updated_at.with_timezone(&Utc),
        }
    }
}

/// A team member.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberResponse {
    /// Member user ID.
    pub user_id: Uuid,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
    /// The user, if still present.
    pub user: Option<UserRef>,
}

impl From<TeamMember> for TeamMemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            user_id: member.membership.user_id,
            joined_at: member.membership.joined_at.with_timezone(&Utc),
            user: member.user.map(UserRef::from),
        }
    }
}

/// A team with its members.
#[derive(Debug, Serialize)]
pub struct TeamDetailResponse {
    /// The team.
    #[serde(flatten)]
    pub team: TeamResponse,
    /// Members.
    pub members: Vec<TeamMemberResponse>,
}

impl From<TeamDetail> for TeamDetailResponse {
    fn from(detail: TeamDetail) -> Self {
        Self {
            team: detail.team.into(),
            members: detail
                .members
                .into_iter()
                .map(TeamMemberResponse::from)
                .collect(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/teams`
async fn list_teams(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListTeamsQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamRead)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let result = TeamRepository::new((*state.db).clone())
        .list(query.search.as_deref(), page)
        .await?;
    Ok(ctx.page(result.map(TeamResponse::from)))
}

/// POST `/teams`
async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateTeamRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamWrite)?;

    let team = TeamRepository::new((*state.db).clone())
        .create(payload.name.trim().to_string(), payload.description, ctx.now)
        .await?;
    Ok(ctx.created(TeamResponse::from(team)))
}

/// GET `/teams/{id}`
async fn get_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamRead)?;

    let detail = TeamRepository::new((*state.db).clone()).find_one(id).await?;
    Ok(ctx.ok(TeamDetailResponse::from(detail)))
}

/// PATCH `/teams/{id}`
async fn update_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTeamRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamWrite)?;

    let team = TeamRepository::new((*state.db).clone())
        .update(id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.ok(TeamResponse::from(team)))
}

/// DELETE `/teams/{id}`
async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamDelete)?;

    TeamRepository::new((*state.db).clone()).delete(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

/// POST `/teams/{id}/members`
/// 409 when the user is already a member.
async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AddTeamMemberRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamWrite)?;

    let member = TeamRepository::new((*state.db).clone())
        .add_member(id, payload.user_id, ctx.now)
        .await?;
    Ok(ctx.created(TeamMemberResponse::from(member)))
}

/// DELETE `/teams/{id}/members/{user_id}`
async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TeamWrite)?;

    TeamRepository::new((*state.db).clone())
        .remove_member(id, user_id)
        .await?;
    Ok(ctx.ok(Deleted { id: user_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use opsledger_core::invoice::Patch;

    use crate::routes::test_support::{request, send};

    #[test]
    fn test_update_request_patches() {
        let req: UpdateTeamRequest =
            serde_json::from_str(r#"{"name": " Ops ", "description": null}"#).unwrap();
        let input = UpdateTeamInput::from(req);

        assert_eq!(input.name.as_deref(), Some("Ops"));
        assert_eq!(input.description, Patch::Clear);
    }

    #[tokio::test]
    async fn test_employee_cannot_create_team() {
        let response = send(request(
            "POST",
            "/api/teams",
            Some(Role::Employees),
            Some(r#"{"name": "Platform"}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_admin_deletes_team() {
        let uri = format!("/api/teams/{}", Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::ProjectManager), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_long_description_is_rejected() {
        let body = format!(r#"{{"name": "Docs", "description": "{}"}}"#, "x".repeat(1001));
        let response = send(request(
            "POST",
            "/api/teams",
            Some(Role::ProjectManager),
            Some(&body),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_finance_cannot_add_member() {
        let uri = format!("/api/teams/{}/members", Uuid::new_v4());
        let body = format!(r#"{{"userId": "{}"}}"#, Uuid::new_v4());
        let response = send(request("POST", &uri, Some(Role::Finance), Some(&body))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
