//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use chrono::{DateTime, Utc};
use opendal::{Buffer, Operator, services};
use uuid::Uuid;

use super::config::{StorageBackend, StorageConfig};
use super::error::StorageError;

/// Prefix of every uploaded object key.
pub const UPLOAD_PREFIX: &str = "uploads";

/// A signed download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The URL.
    pub url: String,
    /// When the URL stops working; `None` for public URLs.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Object storage for uploaded files.
#[derive(Debug, Clone)]
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.backend)?;
        Ok(Self { operator, config })
    }

    fn create_operator(backend: &StorageBackend) -> Result<Operator, StorageError> {
        let operator = match backend {
            StorageBackend::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let mut builder = services::S3::default()
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageBackend::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root))
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
        };

        Ok(operator)
    }

    /// Check size and MIME type before anything is written.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::FileTooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::InvalidMimeType {
                mime_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Object key for a new upload: `uploads/{millis}-{uuid}.{ext}`.
    ///
    /// The extension comes from the original filename, reduced to ASCII
    /// alphanumerics; `bin` when there is none.
    #[must_use]
    pub fn generate_key(filename: &str, now: DateTime<Utc>) -> String {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| {
                ext.chars()
                    .filter(char::is_ascii_alphanumeric)
                    .collect::<String>()
                    .to_ascii_lowercase()
            })
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "bin".to_string());

        format!(
            "{UPLOAD_PREFIX}/{}-{}.{ext}",
            now.timestamp_millis(),
            Uuid::new_v4()
        )
    }

    /// Store an object and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the write fails.
    pub async fn put(
        &self,
        key: &str,
        data: impl Into<Buffer>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let data = data.into();
        self.validate_upload(content_type, u64::try_from(data.len()).unwrap_or(u64::MAX))?;

        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(key, data)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(key, data).await?;
        }

        Ok(self.public_url(key))
    }

    /// Delete an object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Time-limited download URL.
    ///
    /// Falls back to the public URL when the backend cannot presign and a
    /// public base URL is configured.
    ///
    /// # Errors
    ///
    /// Returns `SigningUnavailable` when neither is possible.
    pub async fn signed_url(&self, key: &str) -> Result<SignedUrl, StorageError> {
        if self.operator.info().full_capability().presign_read {
            let ttl = Duration::from_secs(self.config.signed_url_ttl_secs);
            let presigned = self.operator.presign_read(key, ttl).await?;
            let ttl_secs = i64::try_from(self.config.signed_url_ttl_secs).unwrap_or(i64::MAX);
            return Ok(SignedUrl {
                url: presigned.uri().to_string(),
                expires_at: Some(Utc::now() + chrono::Duration::seconds(ttl_secs)),
            });
        }

        match self.config.public_base_url {
            Some(_) => Ok(SignedUrl {
                url: self.public_url(key),
                expires_at: None,
            }),
            None => Err(StorageError::SigningUnavailable),
        }
    }

    /// Public URL of an object, or the bare key when no base URL is set.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        match &self.config.public_base_url {
            Some(base) => format!("{}/{key}", base.trim_end_matches('/')),
            None => key.to_string(),
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.backend.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn local(root: PathBuf) -> StorageService {
        let config = StorageConfig::new(StorageBackend::LocalFs { root })
            .with_max_file_size(1024)
            .with_public_base_url("http://localhost:8080/static/");
        StorageService::from_config(config).expect("should create service")
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("opsledger-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_generate_key_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let key = StorageService::generate_key("Receipt March.PDF", now);

        let rest = key.strip_prefix("uploads/").unwrap();
        let (stem, ext) = rest.rsplit_once('.').unwrap();
        assert_eq!(ext, "pdf");
        assert!(stem.starts_with(&format!("{}-", now.timestamp_millis())));
        assert!(Uuid::parse_str(&stem[stem.len() - 36..]).is_ok());
    }

    #[test]
    fn test_generate_key_without_extension() {
        let key = StorageService::generate_key("README", Utc::now());
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_key_strips_unsafe_extension_chars() {
        let key = StorageService::generate_key("x.p/d f", Utc::now());
        assert!(key.ends_with(".pdf"));
    }

    #[test]
    fn test_validate_upload() {
        let service = local(temp_root());

        assert!(service.validate_upload("application/pdf", 512).is_ok());
        assert!(matches!(
            service.validate_upload("application/pdf", 2048),
            Err(StorageError::FileTooLarge { size: 2048, max: 1024 })
        ));
        assert!(matches!(
            service.validate_upload("application/x-executable", 10),
            Err(StorageError::InvalidMimeType { .. })
        ));
    }

    #[test]
    fn test_public_url_joins_base() {
        let service = local(temp_root());
        assert_eq!(
            service.public_url("uploads/a.pdf"),
            "http://localhost:8080/static/uploads/a.pdf"
        );
    }

    #[tokio::test]
    async fn test_put_and_delete_on_local_fs() {
        let root = temp_root();
        let service = local(root.clone());
        let key = StorageService::generate_key("note.pdf", Utc::now());

        let url = service
            .put(&key, b"%PDF-1.4".to_vec(), "application/pdf")
            .await
            .unwrap();

        assert!(url.ends_with(&key));
        assert!(root.join(&key).exists());

        service.delete(&key).await.unwrap();
        assert!(!root.join(&key).exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_put_rejects_oversized_body() {
        let service = local(temp_root());
        let err = service
            .put("uploads/big.pdf", vec![0u8; 2048], "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_signed_url_falls_back_to_public_url() {
        let service = local(temp_root());
        let signed = service.signed_url("uploads/a.pdf").await.unwrap();
        assert_eq!(signed.url, "http://localhost:8080/static/uploads/a.pdf");
        assert_eq!(signed.expires_at, None);
    }

    #[tokio::test]
    async fn test_signed_url_without_base_is_unavailable() {
        let config = StorageConfig::new(StorageBackend::LocalFs { root: temp_root() });
        let service = StorageService::from_config(config).unwrap();
        assert!(matches!(
            service.signed_url("uploads/a.pdf").await,
            Err(StorageError::SigningUnavailable)
        ));
    }
}
