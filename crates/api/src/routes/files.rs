//! Stored file routes and the multipart upload helper used by the
//! invoice and reimbursement attachment endpoints.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Response,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use opsledger_core::access::Operation;
use opsledger_core::storage::StorageService;
use opsledger_db::FileRepository;
use opsledger_db::entities::files;
use opsledger_db::repositories::NewFile;
use opsledger_shared::AppError;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::views::Deleted;
use crate::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Creates the file routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/files/{id}", get(get_file).delete(delete_file))
}

// ============================================================================
// Response Types
// ============================================================================

/// Stored file metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File ID.
    pub id: Uuid,
    /// Original filename.
    pub original_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Storage provider.
    pub provider: String,
    /// URL recorded at upload time.
    pub url: String,
    /// Uploader.
    pub uploaded_by_id: Uuid,
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Time-limited download link, on single-file reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// When `download_url` stops working.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url_expires_at: Option<DateTime<Utc>>,
}

impl From<files::Model> for FileResponse {
    fn from(file: files::Model) -> Self {
        Self {
            id: file.id,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size: file.size,
            provider: file.provider,
            url: file.url,
            uploaded_by_id: file.uploaded_by_id,
            created_at: file.created_at.with_timezone(&Utc),
            download_url: None,
            download_url_expires_at: None,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// The configured storage service, or 503.
pub(crate) fn require_storage(state: &AppState) -> ApiResult<Arc<StorageService>> {
    state
        .storage
        .clone()
        .ok_or_else(|| ApiError::unavailable("File storage is not configured"))
}

/// Reads the `file` part, writes it to storage and records it.
///
/// The object is removed again when the metadata insert fails.
pub(crate) async fn store_upload(
    state: &AppState,
    storage: &StorageService,
    uploaded_by: Uuid,
    mut multipart: Multipart,
    now: DateTime<Utc>,
) -> ApiResult<files::Model> {
    let (original_name, content_type, data) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError(AppError::field(FILE_FIELD, e.body_text())))?
            .ok_or_else(|| ApiError(AppError::field(FILE_FIELD, "file is required")))?;

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError(AppError::field(FILE_FIELD, e.body_text())))?;
        break (original_name, content_type, data);
    };

    let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
    storage.validate_upload(&content_type, size)?;

    let key = StorageService::generate_key(&original_name, now);
    let url = storage.put(&key, data, &content_type).await?;

    let record = NewFile {
        storage_key: key.clone(),
        url,
        original_name,
        mime_type: content_type,
        size,
        provider: storage.provider_name().to_string(),
    };

    match FileRepository::new((*state.db).clone())
        .create(uploaded_by, record, now)
        .await
    {
        Ok(file) => Ok(file),
        Err(e) => {
            if let Err(cleanup) = storage.delete(&key).await {
                warn!(key = %key, error = %cleanup, "failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

/// Removes an upload whose attachment could not be recorded.
pub(crate) async fn discard_upload(state: &AppState, storage: &StorageService, file: &files::Model) {
    if let Err(e) = FileRepository::new((*state.db).clone()).delete(file.id).await {
        warn!(file_id = %file.id, error = %e, "failed to remove orphaned file row");
    }
    if let Err(e) = storage.delete(&file.storage_key).await {
        warn!(key = %file.storage_key, error = %e, "failed to remove orphaned upload");
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/files/{id}`
/// File metadata with a signed download URL.
async fn get_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::FileView)?;
    let storage = require_storage(&state)?;

    let file = FileRepository::new((*state.db).clone()).find(id).await?;
    let signed = storage.signed_url(&file.storage_key).await?;

    let mut response = FileResponse::from(file);
    response.download_url = Some(signed.url);
    response.download_url_expires_at = signed.expires_at;
    Ok(ctx.ok(response))
}

/// DELETE `/files/{id}`
/// Removes the stored object, then its metadata.
async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::FileDelete)?;
    let storage = require_storage(&state)?;

    let repo = FileRepository::new((*state.db).clone());
    let file = repo.find(id).await?;
    storage.delete(&file.storage_key).await?;
    repo.delete(id).await?;

    info!(file_id = %id, user_id = %auth.user_id(), "file deleted");
    Ok(ctx.ok(Deleted { id }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use uuid::Uuid;

    use crate::routes::test_support::{json, request, send};

    #[tokio::test]
    async fn test_file_read_without_storage_is_unavailable() {
        let uri = format!("/api/files/{}", Uuid::new_v4());
        let response = send(request("GET", &uri, Some(Role::Employees), None)).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(response).await["error"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_file_delete_is_admin_only() {
        let uri = format!("/api/files/{}", Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Finance), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
