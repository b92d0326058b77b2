//! Storage error types.

use opsledger_shared::AppError;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// MIME type not allowed.
    #[error("MIME type '{mime_type}' is not allowed")]
    InvalidMimeType {
        /// The rejected MIME type.
        mime_type: String,
    },

    /// Object missing from the bucket.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The backend cannot sign URLs and no public base URL is configured.
    #[error("storage backend cannot produce download URLs")]
    SigningUnavailable,

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// OpenDAL operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::FileTooLarge { .. } | StorageError::InvalidMimeType { .. } => {
                Self::field("file", err.to_string())
            }
            StorageError::NotFound(key) => Self::NotFound(format!("stored object {key}")),
            StorageError::SigningUnavailable | StorageError::Configuration(_) => {
                Self::Unavailable(err.to_string())
            }
            StorageError::Operation(msg) => Self::ExternalService(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limits_are_field_errors() {
        let err: AppError = StorageError::FileTooLarge { size: 20, max: 10 }.into();
        assert!(matches!(err, AppError::Validation { ref errors, .. } if errors[0].field == "file"));
    }

    #[test]
    fn test_operation_failure_is_external() {
        let err: AppError = StorageError::Operation("timeout".into()).into();
        assert_eq!(err.status_code(), 500);
    }
}
