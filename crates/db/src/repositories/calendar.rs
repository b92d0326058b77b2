//! Calendar queries.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveEnum, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use tracing::error;

use opsledger_core::access::{Principal, Resource, scope};
use opsledger_core::calendar::{CalendarEvent, timeline};
use opsledger_shared::AppError;

use crate::entities::{projects, tasks};
use crate::visibility::{project_condition, task_condition};

/// Error types for calendar queries.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Database(e) => {
                error!(error = %e, "calendar query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Calendar repository.
#[derive(Debug, Clone)]
pub struct CalendarRepository {
    db: DatabaseConnection,
}

impl CalendarRepository {
    /// Creates a new calendar repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Project timelines and task deadlines visible to `principal`, in
    /// start order, optionally limited to events touching `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn events(
        &self,
        principal: &Principal,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let projects = projects::Entity::find()
            .filter(project_condition(scope(principal, Resource::Project)))
            .filter(projects::Column::StartDate.is_not_null())
            .filter(projects::Column::EndDate.is_not_null())
            .all(&self.db)
            .await?;

        let mut task_query =
            tasks::Entity::find().filter(task_condition(scope(principal, Resource::Task)));
        if let Some(from) = from {
            task_query = task_query.filter(tasks::Column::Deadline.gte(from));
        }
        if let Some(to) = to {
            task_query = task_query.filter(tasks::Column::Deadline.lte(to));
        }
        let tasks = task_query.all(&self.db).await?;

        let project_events = projects.into_iter().filter_map(|p| {
            CalendarEvent::project(p.id, p.name, p.start_date, p.end_date, &p.status.to_value())
        });
        let task_events = tasks.into_iter().map(|t| {
            CalendarEvent::task(
                t.id,
                t.title,
                t.deadline.with_timezone(&Utc),
                t.status.into(),
                t.project_id,
            )
        });

        Ok(timeline(project_events.chain(task_events), from, to))
    }
}
