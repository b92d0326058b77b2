//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use opsledger_core::access::{AccessError, Operation, Principal, Role, authorize};
use opsledger_shared::{Claims, JwtError};

use crate::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::unauthorized("Authorization header with Bearer token is required")
            .into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(JwtError::Expired) => ApiError::unauthorized("Token has expired").into_response(),
        Err(_) => ApiError::unauthorized("Invalid or malformed token").into_response(),
    }
}

/// The authenticated caller.
///
/// Built from the claims the middleware stored; the role claim is parsed
/// case-insensitively and an unknown role is rejected with 401.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> ApiResult<Response> {
///     auth.authorize(Operation::InvoiceCreate)?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    /// Returns the user ID.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.0.user_id
    }

    /// Returns the user's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Returns the principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.0
    }

    /// Checks the operation's role allow-list.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::RoleNotAllowed` (403) when the role is not listed.
    pub fn authorize(&self, operation: Operation) -> Result<(), AccessError> {
        authorize(&self.0, operation)
    }
}

impl TryFrom<&Claims> for AuthUser {
    type Error = AccessError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let role =
            Role::parse(&claims.role).ok_or_else(|| AccessError::UnknownRole(claims.role.clone()))?;
        Ok(Self(Principal::new(claims.user_id(), role)))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        Ok(Self::try_from(claims)?)
    }
}
