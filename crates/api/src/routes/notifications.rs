//! The caller's notification inbox.
//!
//! Every authenticated user may read their own inbox, so these handlers
//! carry no role check; rows are always filtered by the caller's id.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use opsledger_db::NotificationRepository;
use opsledger_db::entities::{notifications, sea_orm_active_enums::NotificationType};

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::response::RequestContext;

/// Creates the notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", patch(mark_all_read))
        .route("/notifications/{id}/read", patch(mark_read))
}

/// A stored notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    /// Notification ID.
    pub id: Uuid,
    /// Kind.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Record the notification is about.
    pub reference_id: Option<Uuid>,
    /// Kind of that record.
    pub reference_type: Option<String>,
    /// Read flag.
    pub is_read: bool,
    /// Whether an email copy went out.
    pub email_sent: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for NotificationResponse {
    fn from(n: notifications::Model) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title,
            message: n.message,
            reference_id: n.reference_id,
            reference_type: n.reference_type,
            is_read: n.is_read,
            email_sent: n.email_sent,
            created_at: n.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
struct Count {
    count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Updated {
    updated_count: u64,
}

/// GET `/notifications`
async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
) -> ApiResult<Response> {
    let rows = NotificationRepository::new((*state.db).clone())
        .list_for_user(auth.user_id())
        .await?;
    let body: Vec<NotificationResponse> = rows.into_iter().map(NotificationResponse::from).collect();
    Ok(ctx.ok(body))
}

/// GET `/notifications/unread-count`
async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
) -> ApiResult<Response> {
    let count = NotificationRepository::new((*state.db).clone())
        .unread_count(auth.user_id())
        .await?;
    Ok(ctx.ok(Count { count }))
}

/// PATCH `/notifications/{id}/read`
/// Another user's notification is reported as not found.
async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let notification = NotificationRepository::new((*state.db).clone())
        .mark_read(auth.user_id(), id)
        .await?;
    Ok(ctx.ok(NotificationResponse::from(notification)))
}

/// PATCH `/notifications/read-all`
async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
) -> ApiResult<Response> {
    let updated_count = NotificationRepository::new((*state.db).clone())
        .mark_all_read(auth.user_id())
        .await?;
    Ok(ctx.ok(Updated { updated_count }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::test_support::{request, send};

    #[tokio::test]
    async fn test_inbox_requires_token() {
        let response = send(request("GET", "/api/notifications", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_notification_id() {
        let response = send(request(
            "PATCH",
            "/api/notifications/not-a-uuid/read",
            Some(opsledger_core::access::Role::Employees),
            None,
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
