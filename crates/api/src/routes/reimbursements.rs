//! Reimbursement claim routes.
//!
//! Approve, reject and pay run the claim state machine inside one
//! transaction; the notice for the submitter is delivered afterwards on a
//! detached task so a slow mail server never delays the response.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Response,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_core::reimbursement::ReimbursementStatus;
use opsledger_db::ReimbursementRepository;
use opsledger_db::entities::{reimbursements, sea_orm_active_enums};
use opsledger_db::repositories::{
    CreateReimbursementInput, ReimbursementDetail, ReimbursementFilter, TransitionOutcome,
};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, non_negative_amount, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::files::{FileResponse, discard_upload, require_storage, store_upload};
use crate::routes::views::{NamedRef, UserRef};

/// Creates the reimbursement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reimbursements",
            get(list_reimbursements).post(create_reimbursement),
        )
        .route("/reimbursements/{id}", get(get_reimbursement))
        .route("/reimbursements/{id}/approve", patch(approve))
        .route("/reimbursements/{id}/reject", patch(reject))
        .route("/reimbursements/{id}/pay", patch(mark_paid))
        .route("/reimbursements/{id}/attachments", post(add_attachment))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing claims.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListReimbursementsQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Only claims in this state.
    pub status: Option<ReimbursementStatus>,
    /// Only claims charged to this project.
    pub project_id: Option<Uuid>,
}

/// Request body for submitting a claim.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReimbursementRequest {
    /// Short title.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    /// Details.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Claimed amount.
    #[validate(custom(function = "non_negative_amount"))]
    pub amount: Decimal,
    /// Expense category.
    pub category_id: Uuid,
    /// Project the expense belongs to.
    pub project_id: Option<Uuid>,
}

/// Request body for rejecting a claim.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    /// Shown to the submitter.
    #[validate(custom(function = "not_blank"), length(max = 1000))]
    pub rejection_reason: String,
}

impl From<CreateReimbursementRequest> for CreateReimbursementInput {
    fn from(req: CreateReimbursementRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: req.description,
            amount: req.amount,
            category_id: req.category_id,
            project_id: req.project_id,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A reimbursement claim.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementResponse {
    /// Claim ID.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Details.
    pub description: Option<String>,
    /// Claimed amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Expense category.
    pub category_id: Uuid,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Current state.
    pub status: sea_orm_active_enums::ReimbursementStatus,
    /// Submitter.
    pub submitted_by_id: Uuid,
    /// Who approved or rejected it.
    pub approved_by_id: Option<Uuid>,
    /// Set when rejected.
    pub rejection_reason: Option<String>,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Decision time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Payout time.
    pub paid_at: Option<DateTime<Utc>>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<reimbursements::Model> for ReimbursementResponse {
    fn from(claim: reimbursements::Model) -> Self {
        Self {
            id: claim.id,
            title: claim.title,
            description: claim.description,
            amount: claim.amount,
            category_id: claim.category_id,
            project_id: claim.project_id,
            status: claim.status,
            submitted_by_id: claim.submitted_by_id,
            approved_by_id: claim.approved_by_id,
            rejection_reason: claim.rejection_reason,
            submitted_at: claim.submitted_at.with_timezone(&Utc),
            approved_at: claim.approved_at.map(|d| d.with_timezone(&Utc)),
            paid_at: claim.paid_at.map(|d| d.with_timezone(&Utc)),
            updated_at: claim.updated_at.with_timezone(&Utc),
        }
    }
}

/// A claim with its related records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementDetailResponse {
    /// The claim.
    #[serde(flatten)]
    pub reimbursement: ReimbursementResponse,
    /// Category.
    pub category: Option<NamedRef>,
    /// Linked project.
    pub project: Option<NamedRef>,
    /// Submitter.
    pub submitted_by: Option<UserRef>,
    /// Approver.
    pub approved_by: Option<UserRef>,
    /// Receipts.
    pub attachments: Vec<FileResponse>,
}

impl From<ReimbursementDetail> for ReimbursementDetailResponse {
    fn from(detail: ReimbursementDetail) -> Self {
        Self {
            reimbursement: detail.reimbursement.into(),
            category: detail.category.map(NamedRef::from),
            project: detail.project.map(NamedRef::from),
            submitted_by: detail.submitted_by.map(UserRef::from),
            approved_by: detail.approved_by.map(UserRef::from),
            attachments: detail.attachments.into_iter().map(FileResponse::from).collect(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Hands the notice to the notifier and returns the updated claim.
fn settle(state: &AppState, outcome: TransitionOutcome) -> ReimbursementResponse {
    info!(
        reimbursement_id = %outcome.reimbursement.id,
        status = ?outcome.reimbursement.status,
        "reimbursement transitioned"
    );
    // Delivery failures are logged by the notifier and never reach the caller.
    drop(state.notifier().dispatch(outcome.notice));
    outcome.reimbursement.into()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/reimbursements`
/// Claims visible to the caller, newest first.
async fn list_reimbursements(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListReimbursementsQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementList)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let filter = ReimbursementFilter {
        status: query.status,
        project_id: query.project_id,
    };

    let result = ReimbursementRepository::new((*state.db).clone())
        .list(auth.principal(), filter, page)
        .await?;
    Ok(ctx.page(result.map(ReimbursementResponse::from)))
}

/// POST `/reimbursements`
/// New claims start PENDING.
async fn create_reimbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateReimbursementRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementCreate)?;

    let claim = ReimbursementRepository::new((*state.db).clone())
        .create(auth.user_id(), payload.into(), ctx.now)
        .await?;
    Ok(ctx.created(ReimbursementResponse::from(claim)))
}

/// GET `/reimbursements/{id}`
async fn get_reimbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementView)?;

    let detail = ReimbursementRepository::new((*state.db).clone())
        .find_one(auth.principal(), id)
        .await?;
    Ok(ctx.ok(ReimbursementDetailResponse::from(detail)))
}

/// PATCH `/reimbursements/{id}/approve`
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementApprove)?;

    let outcome = ReimbursementRepository::new((*state.db).clone())
        .approve(id, auth.user_id(), ctx.now)
        .await?;
    Ok(ctx.ok(settle(&state, outcome)))
}

/// PATCH `/reimbursements/{id}/reject`
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RejectRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementReject)?;

    let outcome = ReimbursementRepository::new((*state.db).clone())
        .reject(id, auth.user_id(), payload.rejection_reason.trim(), ctx.now)
        .await?;
    Ok(ctx.ok(settle(&state, outcome)))
}

/// PATCH `/reimbursements/{id}/pay`
async fn mark_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementMarkPaid)?;

    let outcome = ReimbursementRepository::new((*state.db).clone())
        .mark_paid(id, ctx.now)
        .await?;
    Ok(ctx.ok(settle(&state, outcome)))
}

/// POST `/reimbursements/{id}/attachments`
/// Multipart upload of a receipt in the `file` part.
async fn add_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Response> {
    auth.authorize(Operation::ReimbursementAttach)?;
    let storage = require_storage(&state)?;

    let file = store_upload(&state, &storage, auth.user_id(), multipart, ctx.now).await?;
    if let Err(e) = ReimbursementRepository::new((*state.db).clone())
        .add_attachment(auth.principal(), id, file.id, ctx.now)
        .await
    {
        discard_upload(&state, &storage, &file).await;
        return Err(e.into());
    }
    Ok(ctx.created(FileResponse::from(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;

    use crate::routes::test_support::{json, request, send};

    fn uri(action: &str) -> String {
        format!("/api/reimbursements/{}/{action}", Uuid::new_v4())
    }

    #[test]
    fn test_create_request_trims_title() {
        let req: CreateReimbursementRequest = serde_json::from_str(
            r#"{"title": "  Taxi  ", "amount": 0, "categoryId": "6f1c1f4e-3b8e-4c0e-9a51-0f7c8b8d2a10"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(CreateReimbursementInput::from(req).title, "Taxi");
    }

    #[tokio::test]
    async fn test_employee_cannot_approve() {
        let response = send(request("PATCH", &uri("approve"), Some(Role::Employees), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_project_manager_cannot_pay() {
        let response = send(request("PATCH", &uri("pay"), Some(Role::ProjectManager), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_blank_rejection_reason() {
        let response = send(request(
            "PATCH",
            &uri("reject"),
            Some(Role::Finance),
            Some(r#"{"rejectionReason": "   "}"#),
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "rejectionReason");
    }

    #[tokio::test]
    async fn test_negative_claim_amount() {
        let body = r#"{"title": "Hotel", "amount": -5, "categoryId": "6f1c1f4e-3b8e-4c0e-9a51-0f7c8b8d2a10"}"#;
        let response = send(request("POST", "/api/reimbursements", Some(Role::Employees), Some(body))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let response = send(request(
            "POST",
            "/api/reimbursements",
            Some(Role::Employees),
            Some("{not json"),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_receipt_upload_without_storage() {
        let mut req = request("POST", &uri("attachments"), Some(Role::Employees), None);
        req.headers_mut().insert(
            "content-type",
            "multipart/form-data; boundary=X-BOUNDARY".parse().unwrap(),
        );
        let response = send(req).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
