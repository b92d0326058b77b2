//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories, one per aggregate, taking an explicit `Principal` where rows are scoped
//! - Translation of visibility scopes into SQL conditions
//! - The SQL migration

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod visibility;

pub use repositories::{
    CalendarRepository, CatalogRepository, DashboardRepository, FileRepository,
    InvoiceRepository, NotificationRepository, ProjectRecordRepository, ProjectRepository,
    ReimbursementRepository, TaskRepository, TeamRepository, UserRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use opsledger_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the `database` config section.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
