//! Project document and activity routes.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Response,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_db::ProjectRecordRepository;
use opsledger_db::entities::{
    project_activities, project_documents, sea_orm_active_enums::DocumentType,
};
use opsledger_db::repositories::{CreateActivityInput, ProjectDocument, UpdateActivityInput};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::files::{FileResponse, discard_upload, require_storage, store_upload};
use crate::routes::views::Deleted;

/// Creates the project document and activity routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{id}/documents",
            get(list_documents).post(upload_document),
        )
        .route(
            "/projects/{id}/documents/{document_id}",
            patch(update_document).delete(delete_document),
        )
        .route(
            "/projects/{id}/activities",
            get(list_activities).post(create_activity),
        )
        .route(
            "/projects/{id}/activities/{activity_id}",
            patch(update_activity).delete(delete_activity),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters of a document upload; the body carries the `file` part.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UploadDocumentQuery {
    /// Display name; the uploaded filename when absent.
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub name: Option<String>,
    /// Document kind; OTHER when absent.
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
}

/// Request body for renaming or retyping a document.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDocumentRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub name: Option<String>,
    /// New kind.
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
}

/// Query parameters for listing activities.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListActivitiesQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
}

/// Request body for recording an activity.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    /// Title.
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title: String,
    /// Description.
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// When it happened; now when absent.
    pub activity_date: Option<DateTime<Utc>>,
}

/// Request body for a partial activity update; `null` clears the description.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    /// New title.
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub title: Option<String>,
    /// Description.
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    /// New date.
    pub activity_date: Option<DateTime<Utc>>,
}

impl From<CreateActivityRequest> for CreateActivityInput {
    fn from(req: CreateActivityRequest) -> Self {
        Self {
            title: req.title.trim().to_string(),
            description: req.description,
            activity_date: req.activity_date,
        }
    }
}

impl From<UpdateActivityRequest> for UpdateActivityInput {
    fn from(req: UpdateActivityRequest) -> Self {
        Self {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description.into(),
            activity_date: req.activity_date,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A project document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    /// Document ID.
    pub id: Uuid,
    /// Project.
    pub project_id: Uuid,
    /// Display name.
    pub name: String,
    /// Kind.
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    /// Uploader.
    pub uploaded_by_id: Uuid,
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Stored file.
    pub file: Option<FileResponse>,
}

impl From<project_documents::Model> for DocumentResponse {
    fn from(document: project_documents::Model) -> Self {
        Self {
            id: document.id,
            project_id: document.project_id,
            name: document.name,
            document_type: document.document_type,
            uploaded_by_id: document.uploaded_by_id,
            created_at: document.created_at.with_timezone(&Utc),
            updated_at: document.updated_at.with_timezone(&Utc),
            file: None,
        }
    }
}

impl From<ProjectDocument> for DocumentResponse {
    fn from(record: ProjectDocument) -> Self {
        let mut response = Self::from(record.document);
        response.file = record.file.map(FileResponse::from);
        response
    }
}

/// A project activity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    /// Activity ID.
    pub id: Uuid,
    /// Project.
    pub project_id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// When it happened.
    pub activity_date: DateTime<Utc>,
    /// Author.
    pub created_by_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<project_activities::Model> for ActivityResponse {
    fn from(activity: project_activities::Model) -> Self {
        Self {
            id: activity.id,
            project_id: activity.project_id,
            title: activity.title,
            description: activity.description,
            activity_date: activity.activity_date.with_timezone(&Utc),
            created_by_id: activity.created_by_id,
            created_at: activity.created_at.with_timezone(&Utc),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/projects/{id}/documents`
async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectView)?;

    let documents = ProjectRecordRepository::new((*state.db).clone())
        .list_documents(auth.principal(), id)
        .await?;
    let body: Vec<DocumentResponse> = documents.into_iter().map(DocumentResponse::from).collect();
    Ok(ctx.ok(body))
}

/// POST `/projects/{id}/documents?name=&type=`
/// Multipart upload with a `file` part.
async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<UploadDocumentQuery>,
    multipart: Multipart,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectDocumentWrite)?;
    let storage = require_storage(&state)?;

    let file = store_upload(&state, &storage, auth.user_id(), multipart, ctx.now).await?;
    let name = query
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or_else(|| file.original_name.clone());
    let document_type = query.document_type.unwrap_or(DocumentType::Other);

    match ProjectRecordRepository::new((*state.db).clone())
        .add_document(auth.principal(), id, name, document_type, file.clone(), ctx.now)
        .await
    {
        Ok(document) => Ok(ctx.created(DocumentResponse::from(document))),
        Err(e) => {
            discard_upload(&state, &storage, &file).await;
            Err(e.into())
        }
    }
}

/// PATCH `/projects/{id}/documents/{document_id}`
async fn update_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateDocumentRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectDocumentWrite)?;

    let document = ProjectRecordRepository::new((*state.db).clone())
        .update_document(
            auth.principal(),
            id,
            document_id,
            payload.name.map(|n| n.trim().to_string()),
            payload.document_type,
            ctx.now,
        )
        .await?;
    Ok(ctx.ok(DocumentResponse::from(document)))
}

/// DELETE `/projects/{id}/documents/{document_id}`
/// The stored object goes too when storage is configured.
async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectDocumentWrite)?;

    let file = ProjectRecordRepository::new((*state.db).clone())
        .delete_document(auth.principal(), id, document_id)
        .await?;
    if let (Some(file), Some(storage)) = (file, state.storage.clone()) {
        discard_upload(&state, &storage, &file).await;
    }
    Ok(ctx.ok(Deleted { id: document_id }))
}

/// GET `/projects/{id}/activities`
/// Most recent first.
async fn list_activities(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedQuery(query): ValidatedQuery<ListActivitiesQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectView)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let result = ProjectRecordRepository::new((*state.db).clone())
        .list_activities(auth.principal(), id, page)
        .await?;
    Ok(ctx.page(result.map(ActivityResponse::from)))
}

/// POST `/projects/{id}/activities`
async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateActivityRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectActivityCreate)?;

    let activity = ProjectRecordRepository::new((*state.db).clone())
        .add_activity(auth.principal(), id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.created(ActivityResponse::from(activity)))
}

/// PATCH `/projects/{id}/activities/{activity_id}`
async fn update_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, activity_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateActivityRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectActivityManage)?;

    let activity = ProjectRecordRepository::new((*state.db).clone())
        .update_activity(auth.principal(), id, activity_id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.ok(ActivityResponse::from(activity)))
}

/// DELETE `/projects/{id}/activities/{activity_id}`
async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path((id, activity_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    auth.authorize(Operation::ProjectActivityManage)?;

    ProjectRecordRepository::new((*state.db).clone())
        .delete_activity(auth.principal(), id, activity_id)
        .await?;
    Ok(ctx.ok(Deleted { id: activity_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;

    use crate::routes::test_support::{json, request, send};

    #[test]
    fn test_document_type_uses_type_key() {
        let req: UpdateDocumentRequest = serde_json::from_str(r#"{"type": "MINUTES"}"#).unwrap();
        assert_eq!(req.document_type, Some(DocumentType::Minutes));
        assert!(req.name.is_none());
    }

    #[tokio::test]
    async fn test_upload_without_storage_is_unavailable() {
        let uri = format!("/api/projects/{}/documents?type=CONTRACT", Uuid::new_v4());
        let mut req = request("POST", &uri, Some(Role::ProjectManager), None);
        req.headers_mut().insert(
            "content-type",
            "multipart/form-data; boundary=X-BOUNDARY".parse().unwrap(),
        );

        let response = send(req).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["error"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_employee_cannot_delete_document() {
        let uri = format!("/api/projects/{}/documents/{}", Uuid::new_v4(), Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Employees), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_activity_title_is_required() {
        let uri = format!("/api/projects/{}/activities", Uuid::new_v4());
        let response = send(request(
            "POST",
            &uri,
            Some(Role::Employees),
            Some(r#"{"title": ""}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_finance_cannot_edit_activity() {
        let uri = format!("/api/projects/{}/activities/{}", Uuid::new_v4(), Uuid::new_v4());
        let response = send(request(
            "PATCH",
            &uri,
            Some(Role::Finance),
            Some(r#"{"title": "Renamed"}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
