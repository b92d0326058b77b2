//! Liveness and database reachability.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    /// `up` when a ping succeeded.
    pub database: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET `/health`
/// 503 while the database does not answer a ping.
async fn health_check(State(state): State<AppState>) -> Response {
    let (code, status, database) = match state.db.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "up"),
        Err(e) => {
            warn!(error = %e, "health check: database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };

    let body = HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    };
    (code, Json(body)).into_response()
}
