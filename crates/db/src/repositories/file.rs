//! Stored file metadata.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_shared::AppError;

use crate::entities::files;

use super::is_unique_violation;

/// Error types for file metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// File not found.
    #[error("File not found: {0}")]
    NotFound(Uuid),

    /// Storage key already recorded.
    #[error("Storage key '{0}' is already recorded")]
    DuplicateKey(String),

    /// Size does not fit the column.
    #[error("File size {0} is out of range")]
    InvalidSize(u64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(_) => Self::NotFound(err.to_string()),
            FileError::DuplicateKey(_) => Self::Conflict(err.to_string()),
            FileError::InvalidSize(_) => Self::field("file", err.to_string()),
            FileError::Database(e) => {
                error!(error = %e, "file query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Metadata of an object that was just written to storage.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Object key.
    pub storage_key: String,
    /// URL returned by the storage backend.
    pub url: String,
    /// Client-side filename.
    pub original_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Storage provider name.
    pub provider: String,
}

/// File metadata repository.
#[derive(Debug, Clone)]
pub struct FileRepository {
    db: DatabaseConnection,
}

impl FileRepository {
    /// Creates a new file repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an uploaded object.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is already recorded or the insert fails.
    pub async fn create(
        &self,
        uploaded_by: Uuid,
        file: NewFile,
        now: DateTime<Utc>,
    ) -> Result<files::Model, FileError> {
        let size = i64::try_from(file.size).map_err(|_| FileError::InvalidSize(file.size))?;
        let key = file.storage_key.clone();

        let model = files::ActiveModel {
            id: Set(Uuid::new_v4()),
            storage_key: Set(file.storage_key),
            url: Set(file.url),
            original_name: Set(file.original_name),
            mime_type: Set(file.mime_type),
            size: Set(size),
            provider: Set(file.provider),
            uploaded_by_id: Set(uploaded_by),
            created_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                FileError::DuplicateKey(key.clone())
            } else {
                FileError::Database(e)
            }
        })?;

        info!(file_id = %model.id, key = %model.storage_key, size = model.size, "file recorded");
        Ok(model)
    }

    /// Finds a file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn find(&self, id: Uuid) -> Result<files::Model, FileError> {
        files::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(FileError::NotFound(id))
    }

    /// Deletes a file row; attachment rows go with it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn delete(&self, id: Uuid) -> Result<(), FileError> {
        let result = files::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(FileError::NotFound(id));
        }
        info!(file_id = %id, "file deleted");
        Ok(())
    }
}
