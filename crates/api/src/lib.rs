//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api`
//! - Authentication middleware and the `AuthUser` principal extractor
//! - Validated JSON and query extractors
//! - The response envelope and error mapping
//! - The background notifier for workflow notices

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notifier;
pub mod response;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use opsledger_core::storage::{StorageConfig, StorageService};
use opsledger_shared::{EmailService, JwtService};

pub use error::ApiError;
pub use notifier::Notifier;

/// Multipart bodies may exceed the upload limit by this much (boundaries, headers).
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Email service for notification emails.
    pub email_service: Arc<EmailService>,
    /// Storage service for file attachments (optional).
    pub storage: Option<Arc<StorageService>>,
}

impl AppState {
    /// Notifier bound to this state's database and mailer.
    #[must_use]
    pub fn notifier(&self) -> Notifier {
        Notifier::new((*self.db).clone(), self.email_service.clone())
    }

    fn body_limit(&self) -> usize {
        let max = self
            .storage
            .as_ref()
            .map_or(StorageConfig::DEFAULT_MAX_FILE_SIZE, |s| s.config().max_file_size);
        usize::try_from(max)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
