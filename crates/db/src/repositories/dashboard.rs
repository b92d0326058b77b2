//! Dashboard repository.
//!
//! Counts and sums per status, category or month are computed in SQL.
//! Merging and ordering happen in `opsledger_core::dashboard`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use tracing::error;
use uuid::Uuid;

use opsledger_core::access::{Principal, Role};
use opsledger_core::dashboard::{
    AdminSummary, CategoryAmount, DashboardRange, EmployeeSummary, FinanceDashboard, FinanceSummary,
    ProjectManagerSummary, RecentInvoice, RoleSummary, merge_category_totals, monthly_series,
    outstanding, status_rollup,
};
use opsledger_core::invoice::InvoiceStatus;
use opsledger_core::reimbursement::ReimbursementStatus;
use opsledger_shared::AppError;

use crate::entities::sea_orm_active_enums::{
    InvoiceStatus as DbInvoiceStatus, InvoiceType as DbInvoiceType, ProjectStatus,
    ReimbursementStatus as DbReimbursementStatus,
};
use crate::entities::{categories, invoices, projects, reimbursements, users};
use crate::visibility::projects_created_by;

/// Number of rows in the recent invoices list.
const RECENT_INVOICES: u64 = 10;

/// Error types for dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Database(e) => {
                error!(error = %e, "dashboard query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Dashboard repository.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    db: DatabaseConnection,
}

impl DashboardRepository {
    /// Creates a new dashboard repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Builds the finance dashboard.
    ///
    /// Only the monthly series are limited to `range`; the other figures
    /// cover every invoice and claim.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn finance(
        &self,
        range: DashboardRange,
        now: DateTime<Utc>,
    ) -> Result<FinanceDashboard, DashboardError> {
        let (start, end) = range.window(now);

        let income = self.paid_in_window(DbInvoiceType::Income, start, end).await?;
        let expense = self.paid_in_window(DbInvoiceType::Expense, start, end).await?;
        let monthly_income = monthly_series(income);
        let monthly_expense = monthly_series(expense);

        let open_groups: Vec<(DbInvoiceStatus, i64, Decimal)> = invoices::Entity::find()
            .filter(outstanding_condition())
            .select_only()
            .column(invoices::Column::Status)
            .column_as(Expr::col(invoices::Column::Id).count(), "count")
            .column_as(invoices::Column::TotalAmount.sum(), "total")
            .group_by(invoices::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;
        let overdue = invoices::Entity::find()
            .filter(outstanding_condition())
            .filter(invoices::Column::DueDate.lt(now))
            .count(&self.db)
            .await?;
        let summary = outstanding(
            open_groups
                .into_iter()
                .map(|(status, count, total)| (InvoiceStatus::from(status), to_count(count), total)),
            overdue,
        );

        let total_paid_invoices = invoices::Entity::find()
            .filter(invoices::Column::Status.eq(DbInvoiceStatus::Paid))
            .count(&self.db)
            .await?;

        let recent_invoices = invoices::Entity::find()
            .order_by_desc(invoices::Column::CreatedAt)
            .limit(RECENT_INVOICES)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|inv| RecentInvoice {
                id: inv.id,
                invoice_number: inv.invoice_number,
                invoice_type: inv.invoice_type.into(),
                status: inv.status.into(),
                total: inv.total_amount,
            })
            .collect();

        let claim_groups = self.claims_by_status(None).await?;
        let reimbursements_by_status = status_rollup(claim_groups);

        let expenses_by_category = self.expenses_by_category().await?;

        Ok(FinanceDashboard {
            monthly_income,
            monthly_expense,
            outstanding_invoices: 0,
            outstanding_amount: Decimal::ZERO,
            overdue_invoices: 0,
            total_paid_invoices,
            recent_invoices,
            reimbursements_by_status,
            expenses_by_category,
        }
        .with_outstanding(summary))
    }

    /// Builds the summary for the caller's role.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn summary(&self, principal: &Principal) -> Result<RoleSummary, DashboardError> {
        Ok(match principal.role {
            Role::Admin => RoleSummary::Admin(self.admin_summary().await?),
            Role::Finance => RoleSummary::Finance(self.finance_summary().await?),
            Role::ProjectManager => {
                RoleSummary::ProjectManager(self.project_manager_summary(principal.user_id).await?)
            }
            Role::Employees => {
                RoleSummary::Employee(self.employee_summary(principal.user_id).await?)
            }
        })
    }

    async fn paid_in_window(
        &self,
        invoice_type: DbInvoiceType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>, DbErr> {
        let rows: Vec<(DateTimeWithTimeZone, Decimal)> = paid_by_month(invoice_type, start, end)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(month, total)| (month.with_timezone(&Utc), total))
            .collect())
    }

    async fn expenses_by_category(&self) -> Result<Vec<CategoryAmount>, DbErr> {
        let invoice_totals: Vec<(Uuid, Decimal)> = invoices::Entity::find()
            .filter(invoices::Column::InvoiceType.eq(DbInvoiceType::Expense))
            .filter(invoices::Column::Status.eq(DbInvoiceStatus::Paid))
            .select_only()
            .column(invoices::Column::CategoryId)
            .column_as(invoices::Column::TotalAmount.sum(), "total")
            .group_by(invoices::Column::CategoryId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let claim_totals: Vec<(Uuid, Decimal)> = reimbursements::Entity::find()
            .filter(reimbursements::Column::Status.eq(DbReimbursementStatus::Paid))
            .select_only()
            .column(reimbursements::Column::CategoryId)
            .column_as(reimbursements::Column::Amount.sum(), "total")
            .group_by(reimbursements::Column::CategoryId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = invoice_totals
            .iter()
            .chain(&claim_totals)
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let names: HashMap<Uuid, String> = categories::Entity::find()
            .filter(categories::Column::Id.is_in(ids))
            .select_only()
            .column(categories::Column::Id)
            .column(categories::Column::Name)
            .into_tuple::<(Uuid, String)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(merge_category_totals(invoice_totals, claim_totals, &names))
    }

    async fn admin_summary(&self) -> Result<AdminSummary, DbErr> {
        Ok(AdminSummary {
            total_projects: projects::Entity::find().count(&self.db).await?,
            active_projects: projects::Entity::find()
                .filter(projects::Column::Status.eq(ProjectStatus::Active))
                .count(&self.db)
                .await?,
            total_invoices: invoices::Entity::find().count(&self.db).await?,
            unpaid_invoices: invoices::Entity::find()
                .filter(invoices::Column::Status.eq(DbInvoiceStatus::Unpaid))
                .count(&self.db)
                .await?,
            total_reimbursements: reimbursements::Entity::find().count(&self.db).await?,
            pending_reimbursements: reimbursements::Entity::find()
                .filter(reimbursements::Column::Status.eq(DbReimbursementStatus::Pending))
                .count(&self.db)
                .await?,
            total_users: users::Entity::find().count(&self.db).await?,
        })
    }

    async fn finance_summary(&self) -> Result<FinanceSummary, DbErr> {
        let revenue = self.paid_total(DbInvoiceType::Income).await?;
        let expense = self.paid_total(DbInvoiceType::Expense).await?;
        let unpaid = invoices::Entity::find()
            .filter(invoices::Column::Status.eq(DbInvoiceStatus::Unpaid))
            .count(&self.db)
            .await?;
        let pending = reimbursements::Entity::find()
            .filter(reimbursements::Column::Status.eq(DbReimbursementStatus::Pending))
            .count(&self.db)
            .await?;

        Ok(FinanceSummary::new(revenue, expense, unpaid, pending))
    }

    async fn paid_total(&self, invoice_type: DbInvoiceType) -> Result<Decimal, DbErr> {
        let sum: Option<Option<Decimal>> = invoices::Entity::find()
            .filter(invoices::Column::InvoiceType.eq(invoice_type))
            .filter(invoices::Column::Status.eq(DbInvoiceStatus::Paid))
            .select_only()
            .column_as(invoices::Column::TotalAmount.sum(), "total")
            .into_tuple()
            .one(&self.db)
            .await?;

        Ok(sum.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn project_manager_summary(
        &self,
        user_id: Uuid,
    ) -> Result<ProjectManagerSummary, DbErr> {
        let total_projects = projects::Entity::find()
            .filter(projects::Column::CreatedById.eq(user_id))
            .count(&self.db)
            .await?;
        let active_projects = projects::Entity::find()
            .filter(projects::Column::CreatedById.eq(user_id))
            .filter(projects::Column::Status.eq(ProjectStatus::Active))
            .count(&self.db)
            .await?;

        let invoiced: Option<Option<Decimal>> = invoices::Entity::find()
            .filter(invoices::Column::InvoiceType.eq(DbInvoiceType::Income))
            .filter(invoices::Column::ProjectId.in_subquery(projects_created_by(user_id)))
            .select_only()
            .column_as(invoices::Column::TotalAmount.sum(), "total")
            .into_tuple()
            .one(&self.db)
            .await?;

        Ok(ProjectManagerSummary {
            total_projects,
            active_projects,
            invoiced_income: invoiced.flatten().unwrap_or(Decimal::ZERO),
        })
    }

    async fn employee_summary(&self, user_id: Uuid) -> Result<EmployeeSummary, DbErr> {
        let groups = self.claims_by_status(Some(user_id)).await?;
        Ok(EmployeeSummary::from_claims(groups))
    }

    /// `(status, count, total)` per reimbursement status, optionally limited
    /// to one submitter.
    async fn claims_by_status(
        &self,
        submitted_by: Option<Uuid>,
    ) -> Result<Vec<(ReimbursementStatus, u64, Decimal)>, DbErr> {
        let mut query = reimbursements::Entity::find();
        if let Some(user_id) = submitted_by {
            query = query.filter(reimbursements::Column::SubmittedById.eq(user_id));
        }

        let groups: Vec<(DbReimbursementStatus, i64, Decimal)> = query
            .select_only()
            .column(reimbursements::Column::Status)
            .column_as(Expr::col(reimbursements::Column::Id).count(), "count")
            .column_as(reimbursements::Column::Amount.sum(), "total")
            .group_by(reimbursements::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(groups
            .into_iter()
            .map(|(status, count, total)| (ReimbursementStatus::from(status), to_count(count), total))
            .collect())
    }
}

/// Invoices still awaiting payment.
/// Paid invoice totals of one direction inside `[start, end)`, one row per
/// UTC month.
fn paid_by_month(
    invoice_type: DbInvoiceType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Select<invoices::Entity> {
    let month = Expr::cust(
        "date_trunc('month', \"invoices\".\"created_at\" AT TIME ZONE 'UTC') AT TIME ZONE 'UTC'",
    );
    invoices::Entity::find()
        .filter(invoices::Column::InvoiceType.eq(invoice_type))
        .filter(invoices::Column::Status.eq(DbInvoiceStatus::Paid))
        .filter(invoices::Column::CreatedAt.gte(start))
        .filter(invoices::Column::CreatedAt.lt(end))
        .select_only()
        .column_as(month.clone(), "month")
        .column_as(invoices::Column::TotalAmount.sum(), "total")
        .group_by(month)
}

fn outstanding_condition() -> Condition {
    Condition::any()
        .add(invoices::Column::Status.eq(DbInvoiceStatus::Unpaid))
        .add(invoices::Column::Status.eq(DbInvoiceStatus::Debt))
}

/// `COUNT` comes back as BIGINT.
fn to_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}
