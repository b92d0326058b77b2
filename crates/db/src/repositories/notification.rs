//! Notification repository.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::error;
use uuid::Uuid;

use opsledger_core::notification::Notice;
use opsledger_shared::AppError;

use crate::entities::notifications;

/// Number of notifications returned by `list_for_user`.
pub const LATEST_LIMIT: u64 = 50;

/// Error types for notification operations.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Notification not found for this user.
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(_) => Self::NotFound(err.to_string()),
            NotificationError::Database(e) => {
                error!(error = %e, "notification query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Notification repository.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    db: DatabaseConnection,
}

impl NotificationRepository {
    /// Creates a new notification repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores a notice as an unread notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(
        &self,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> Result<notifications::Model, NotificationError> {
        let notification = notifications::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(notice.user_id),
            notification_type: Set(notice.kind.into()),
            title: Set(notice.title.clone()),
            message: Set(notice.message.clone()),
            reference_id: Set(notice.reference_id),
            reference_type: Set(notice.reference_type.clone()),
            is_read: Set(false),
            email_sent: Set(false),
            created_at: Set(now.into()),
        };

        Ok(notification.insert(&self.db).await?)
    }

    /// Latest notifications of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notifications::Model>, NotificationError> {
        Ok(notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt)
            .limit(LATEST_LIMIT)
            .all(&self.db)
            .await?)
    }

    /// Marks one of the user's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the notification does not belong to the user.
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<notifications::Model, NotificationError> {
        let notification = notifications::Entity::find_by_id(id)
            .filter(notifications::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(NotificationError::NotFound(id))?;

        if notification.is_read {
            return Ok(notification);
        }

        let mut active: notifications::ActiveModel = notification.into();
        active.is_read = Set(true);
        Ok(active.update(&self.db).await?)
    }

    /// Marks every unread notification of the user as read.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::IsRead, Expr::value(true))
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Number of unread notifications of the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        Ok(notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::IsRead.eq(false))
            .count(&self.db)
            .await?)
    }

    /// Records that the notification was emailed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_email_sent(&self, id: Uuid) -> Result<(), NotificationError> {
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::EmailSent, Expr::value(true))
            .filter(notifications::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }
}
