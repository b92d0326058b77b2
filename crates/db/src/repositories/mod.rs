//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Each one owns a `thiserror` error type that converts into `AppError`.

pub mod calendar;
pub mod catalog;
mod convert;
pub mod counter;
pub mod dashboard;
pub mod file;
pub mod invoice;
pub mod notification;
pub mod project;
pub mod project_record;
pub mod reimbursement;
pub mod task;
pub mod team;
pub mod user;

pub use calendar::{CalendarError, CalendarRepository};
pub use catalog::{
    CatalogError, CatalogRepository, CategoryInput, TaxInput, UpdateCategoryInput,
    UpdateTaxInput, UpdateVendorInput, VendorInput,
};
pub use counter::CounterError;
pub use dashboard::{DashboardError, DashboardRepository};
pub use file::{FileError, FileRepository, NewFile};
pub use invoice::{
    CreateInvoiceInput, InvoiceDetail, InvoiceError, InvoiceFilter, InvoiceRepository,
    UpdateInvoiceInput,
};
pub use notification::{NotificationError, NotificationRepository};
pub use project::{
    CreateProjectInput, ProjectDetail, ProjectError, ProjectMember, ProjectRepository,
    UpdateProjectInput,
};
pub use project_record::{
    CreateActivityInput, ProjectDocument, ProjectRecordRepository, UpdateActivityInput,
};
pub use reimbursement::{
    CreateReimbursementInput, ReimbursementDetail, ReimbursementError, ReimbursementFilter,
    ReimbursementRepository, TransitionOutcome,
};
pub use task::{
    CreateTaskInput, TaskDetail, TaskError, TaskFilter, TaskRepository, UpdateTaskInput,
};
pub use team::{TeamDetail, TeamError, TeamMember, TeamRepository, UpdateTeamInput};
pub use user::UserRepository;

use sea_orm::{DbErr, SqlErr};

/// Whether the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Whether the error is a foreign key violation.
pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Escapes `LIKE` wildcards in user input.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
