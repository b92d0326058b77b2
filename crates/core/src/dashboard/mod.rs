//! Dashboard reporting.
//!
//! Repositories group and sum in SQL; the functions here merge and order
//! those groups in exact decimal arithmetic. Money becomes a JSON number
//! only when the response types below are serialized.
//!
//! - `range` - Reporting windows
//! - `aggregate` - Grouping and summing
//! - `types` - Response shapes

pub mod aggregate;
pub mod range;
pub mod types;

pub use aggregate::{
    CategoryAmount, MonthlyPoint, OutstandingSummary, StatusTotal, merge_category_totals,
    monthly_series, outstanding, status_rollup,
};
pub use range::DashboardRange;
pub use types::{
    AdminSummary, EmployeeSummary, FinanceDashboard, FinanceSummary, ProjectManagerSummary,
    RecentInvoice, RoleSummary,
};
