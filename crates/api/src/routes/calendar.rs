//! Calendar routes.

use axum::{Router, extract::State, response::Response, routing::get};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_db::CalendarRepository;
use opsledger_shared::AppError;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedQuery;
use crate::middleware::AuthUser;
use crate::response::RequestContext;

/// Creates the calendar routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/calendar/events", get(list_events))
}

/// Optional window; events touching it are returned.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EventsQuery {
    /// Window start.
    pub from: Option<DateTime<Utc>>,
    /// Window end.
    pub to: Option<DateTime<Utc>>,
}

/// GET `/calendar/events?from=&to=`
/// Project timelines and task deadlines visible to the caller.
async fn list_events(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<EventsQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CalendarView)?;

    if let (Some(from), Some(to)) = (query.from, query.to)
        && to < from
    {
        return Err(ApiError(AppError::field("to", "must not be before from")));
    }

    let events = CalendarRepository::new((*state.db).clone())
        .events(auth.principal(), query.from, query.to)
        .await?;
    Ok(ctx.ok(events))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use opsledger_core::access::Role;

    use crate::routes::test_support::{json, request, send};

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let response = send(request(
            "GET",
            "/api/calendar/events?from=2026-02-01T00:00:00Z&to=2026-01-01T00:00:00Z",
            Some(Role::Employees),
            None,
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["errors"][0]["field"], "to");
    }

    #[tokio::test]
    async fn test_calendar_requires_authentication() {
        let response = send(request("GET", "/api/calendar/events", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
