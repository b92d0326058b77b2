//! Mapping of application errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use opsledger_shared::{AppError, FieldError};

/// Error body: `{ "error": CODE, "message": text, "errors"?: [...] }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Field-level failures, only for validation errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// An `AppError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// 401 with the given message.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }

    /// 503 for a collaborator that is not configured.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self(AppError::Unavailable(message.into()))
    }

    /// The wire body for this error.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let message = if self.0.is_client_error() {
            match &self.0 {
                AppError::Validation { message, .. } => message.clone(),
                other => other.to_string(),
            }
        } else {
            "An internal error occurred".to_string()
        };

        let errors = match &self.0 {
            AppError::Validation { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };

        ErrorBody {
            error: self.0.error_code(),
            message,
            errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

macro_rules! into_api_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(AppError::from(err))
                }
            }
        )*
    };
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

into_api_error!(
    opsledger_core::access::AccessError,
    opsledger_core::storage::StorageError,
    opsledger_db::repositories::CalendarError,
    opsledger_db::repositories::CatalogError,
    opsledger_db::repositories::DashboardError,
    opsledger_db::repositories::FileError,
    opsledger_db::repositories::InvoiceError,
    opsledger_db::repositories::NotificationError,
    opsledger_db::repositories::ProjectError,
    opsledger_db::repositories::ReimbursementError,
    opsledger_db::repositories::TaskError,
    opsledger_db::repositories::TeamError,
);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_body_lists_fields() {
        let err = ApiError(AppError::field("rejectionReason", "must not be empty"));
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "must not be empty");
        assert_eq!(body["errors"][0]["field"], "rejectionReason");
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = ApiError(AppError::Database("relation \"invoices\" does not exist".into()));
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "DATABASE_ERROR");
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn test_status_codes() {
        let response = ApiError(AppError::Conflict("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError::unavailable("storage").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
