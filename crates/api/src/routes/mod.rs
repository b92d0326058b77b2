//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod calendar;
pub mod catalog;
pub mod dashboard;
pub mod files;
pub mod health;
pub mod invoices;
pub mod notifications;
pub mod project_records;
pub mod projects;
pub mod reimbursements;
pub mod tasks;
pub mod teams;
pub mod views;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(invoices::routes())
        .merge(reimbursements::routes())
        .merge(dashboard::routes())
        .merge(catalog::routes())
        .merge(projects::routes())
        .merge(project_records::routes())
        .merge(tasks::routes())
        .merge(teams::routes())
        .merge(calendar::routes())
        .merge(notifications::routes())
        .merge(files::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router harness without a database: handlers that reach the store
    //! fail, so tests exercise only what runs before it.

    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, Response, header::AUTHORIZATION},
    };
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;
    use uuid::Uuid;

    use opsledger_core::access::Role;
    use opsledger_shared::{EmailConfig, EmailService, JwtConfig, JwtService};

    use crate::{AppState, create_router};

    pub fn state() -> AppState {
        AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
            email_service: Arc::new(EmailService::new(EmailConfig::default())),
            storage: None,
        }
    }

    pub fn router() -> Router {
        create_router(state())
    }

    pub fn token(role: Role) -> String {
        JwtService::new(JwtConfig::default())
            .generate_access_token(Uuid::new_v4(), role.as_str())
            .unwrap()
    }

    pub fn request(method: &str, uri: &str, role: Option<Role>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token(role)));
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(request: Request<Body>) -> Response<Body> {
        router().oneshot(request).await.unwrap()
    }

    pub async fn json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use opsledger_core::access::Role;

    use super::test_support::{json, request, send};

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = send(request("GET", "/api/invoices", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json(response).await;
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let mut req = request("GET", "/api/invoices", None, None);
        req.headers_mut()
            .insert("authorization", "Bearer not.a.jwt".parse().unwrap());
        let response = send(req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = send(request("GET", "/api/ledgers", Some(Role::Admin), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
