//! Fire-and-forget delivery of workflow notices.
//!
//! ```text
//! transition ──► Notifier::dispatch ──► tokio::spawn
//!                                        ├─ store notification row
//!                                        ├─ email recipient (when enabled)
//!                                        └─ flag email_sent
//! ```
//!
//! Every failure is logged with `warn!` inside the task and never reaches
//! the request that triggered the notice.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use opsledger_core::notification::Notice;
use opsledger_db::{NotificationRepository, UserRepository};
use opsledger_shared::EmailService;

/// Background notice dispatcher.
#[derive(Clone)]
pub struct Notifier {
    db: DatabaseConnection,
    email: Arc<EmailService>,
}

impl Notifier {
    /// Creates a notifier.
    #[must_use]
    pub const fn new(db: DatabaseConnection, email: Arc<EmailService>) -> Self {
        Self { db, email }
    }

    /// Delivers `notice` on a detached task.
    ///
    /// The handle is returned for tests; request handlers drop it.
    pub fn dispatch(&self, notice: Notice) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.deliver(notice).await })
    }

    async fn deliver(&self, notice: Notice) {
        let notifications = NotificationRepository::new(self.db.clone());

        let stored = match notifications.create(&notice, Utc::now()).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(user_id = %notice.user_id, kind = notice.kind.as_str(), error = %e, "failed to store notification");
                return;
            }
        };

        if !self.email.is_enabled() {
            return;
        }

        let recipient = match UserRepository::new(self.db.clone())
            .find_by_id(notice.user_id)
            .await
        {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(user_id = %notice.user_id, "notification recipient not found");
                return;
            }
            Err(e) => {
                warn!(user_id = %notice.user_id, error = %e, "failed to load notification recipient");
                return;
            }
        };

        if let Err(e) = self
            .email
            .send_email(&recipient.email, &notice.title, &notice.message)
            .await
        {
            warn!(notification_id = %stored.id, error = %e, "failed to email notification");
            return;
        }

        match notifications.mark_email_sent(stored.id).await {
            Ok(()) => debug!(notification_id = %stored.id, "notification emailed"),
            Err(e) => warn!(notification_id = %stored.id, error = %e, "failed to flag emailed notification"),
        }
    }
}
