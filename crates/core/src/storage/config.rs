//! Storage configuration types.

use std::path::PathBuf;

use opsledger_shared::{StorageProvider, StorageSettings};

use super::error::StorageError;

/// Resolved storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO
    S3 {
        /// Custom endpoint, if not AWS.
        endpoint: Option<String>,
        /// Bucket name.
        bucket: String,
        /// Access key id.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageBackend {
    /// Provider name recorded with each stored file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Where objects live.
    pub backend: StorageBackend,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Signed download URL TTL in seconds.
    pub signed_url_ttl_secs: u64,
    /// Base URL used when the backend cannot sign URLs.
    pub public_base_url: Option<String>,
    /// Allowed MIME types for upload.
    pub allowed_mime_types: Vec<String>,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default download TTL: 1 hour.
    pub const DEFAULT_SIGNED_URL_TTL: u64 = 3600;

    /// Create a config with default limits.
    #[must_use]
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            signed_url_ttl_secs: Self::DEFAULT_SIGNED_URL_TTL,
            public_base_url: None,
            allowed_mime_types: Self::default_mime_types(),
        }
    }

    /// Build from the `storage` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` when S3 credentials are missing.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let backend = match settings.provider {
            StorageProvider::S3 => StorageBackend::S3 {
                endpoint: settings.endpoint.clone(),
                bucket: settings.bucket.clone(),
                access_key_id: settings
                    .access_key_id
                    .clone()
                    .ok_or_else(|| StorageError::configuration("missing access_key_id"))?,
                secret_access_key: settings
                    .secret_access_key
                    .clone()
                    .ok_or_else(|| StorageError::configuration("missing secret_access_key"))?,
                region: settings
                    .region
                    .clone()
                    .unwrap_or_else(|| "auto".to_string()),
            },
            StorageProvider::LocalFs => StorageBackend::LocalFs {
                root: PathBuf::from(&settings.bucket),
            },
        };

        Ok(Self {
            max_file_size: settings.max_file_size,
            signed_url_ttl_secs: settings.signed_url_ttl_secs,
            public_base_url: settings.public_base_url.clone(),
            ..Self::new(backend)
        })
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the public base URL.
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    /// Default allowed MIME types for attachments.
    #[must_use]
    pub fn default_mime_types() -> Vec<String> {
        [
            // Documents
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.ms-excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "text/csv",
            // Images
            "image/png",
            "image/jpeg",
            "image/webp",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: StorageProvider) -> StorageSettings {
        StorageSettings {
            provider,
            bucket: "attachments".to_string(),
            endpoint: Some("https://account.r2.cloudflarestorage.com".to_string()),
            region: None,
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            public_base_url: None,
            max_file_size: 2048,
            signed_url_ttl_secs: 60,
        }
    }

    #[test]
    fn test_s3_from_settings() {
        let config = StorageConfig::from_settings(&settings(StorageProvider::S3)).unwrap();
        assert_eq!(config.backend.name(), "s3");
        assert_eq!(config.max_file_size, 2048);
        assert_eq!(config.signed_url_ttl_secs, 60);
        assert!(matches!(config.backend, StorageBackend::S3 { ref region, .. } if region == "auto"));
    }

    #[test]
    fn test_s3_requires_credentials() {
        let mut s = settings(StorageProvider::S3);
        s.secret_access_key = None;
        let err = StorageConfig::from_settings(&s).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_local_fs_uses_bucket_as_root() {
        let config = StorageConfig::from_settings(&settings(StorageProvider::LocalFs)).unwrap();
        assert_eq!(
            config.backend,
            StorageBackend::LocalFs {
                root: PathBuf::from("attachments")
            }
        );
        assert_eq!(config.backend.name(), "local");
    }

    #[test]
    fn test_mime_type_validation() {
        let config = StorageConfig::new(StorageBackend::LocalFs {
            root: PathBuf::from("./storage"),
        });
        assert!(config.is_mime_type_allowed("application/pdf"));
        assert!(config.is_mime_type_allowed("IMAGE/PNG"));
        assert!(!config.is_mime_type_allowed("application/x-executable"));
        assert!(!config.is_mime_type_allowed("text/html"));
    }
}
