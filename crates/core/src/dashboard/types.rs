//! Dashboard response shapes.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::{CategoryAmount, MonthlyPoint, OutstandingSummary, StatusTotal};
use crate::invoice::{InvoiceStatus, InvoiceType};
use crate::reimbursement::ReimbursementStatus;

/// Finance dashboard for a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceDashboard {
    /// Paid INCOME totals per month of the window.
    pub monthly_income: Vec<MonthlyPoint>,
    /// Paid EXPENSE totals per month of the window.
    pub monthly_expense: Vec<MonthlyPoint>,
    /// Count of UNPAID or DEBT invoices.
    pub outstanding_invoices: u64,
    /// Sum of outstanding totals.
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
    /// Outstanding invoices past their due date.
    pub overdue_invoices: u64,
    /// PAID invoices of all time.
    pub total_paid_invoices: u64,
    /// Newest invoices first.
    pub recent_invoices: Vec<RecentInvoice>,
    /// Claims grouped by status.
    pub reimbursements_by_status: Vec<StatusTotal>,
    /// Paid expenses and paid claims per category, largest first.
    pub expenses_by_category: Vec<CategoryAmount>,
}

impl FinanceDashboard {
    /// Copies outstanding figures into the dashboard fields.
    #[must_use]
    pub fn with_outstanding(mut self, summary: OutstandingSummary) -> Self {
        self.outstanding_invoices = summary.count;
        self.outstanding_amount = summary.amount;
        self.overdue_invoices = summary.overdue;
        self
    }
}

/// Row of the recent invoices list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentInvoice {
    /// Invoice id.
    pub id: Uuid,
    /// Document number.
    pub invoice_number: String,
    /// Direction.
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    /// Payment status.
    pub status: InvoiceStatus,
    /// Tax-inclusive total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Per-role summary returned by `GET /dashboard/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoleSummary {
    /// ADMIN view.
    Admin(AdminSummary),
    /// FINANCE view.
    Finance(FinanceSummary),
    /// PROJECTMANAGER view.
    ProjectManager(ProjectManagerSummary),
    /// EMPLOYEES view.
    Employee(EmployeeSummary),
}

/// Headline counts for administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct AdminSummary {
    pub total_projects: u64,
    pub active_projects: u64,
    pub total_invoices: u64,
    pub unpaid_invoices: u64,
    pub total_reimbursements: u64,
    pub pending_reimbursements: u64,
    pub total_users: u64,
}

/// Revenue and expense figures for finance staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    #[serde(with = "rust_decimal::serde::float")]
    /// Paid INCOME total.
    pub revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    /// Paid EXPENSE total.
    pub expense: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    /// Revenue minus expense.
    pub profit: Decimal,
    /// UNPAID invoices.
    pub unpaid_invoices: u64,
    /// PENDING claims.
    pub pending_reimbursements: u64,
}

impl FinanceSummary {
    /// Builds the summary; profit is revenue minus expense and may be negative.
    #[must_use]
    pub fn new(
        revenue: Decimal,
        expense: Decimal,
        unpaid_invoices: u64,
        pending_reimbursements: u64,
    ) -> Self {
        Self {
            revenue,
            expense,
            profit: revenue - expense,
            unpaid_invoices,
            pending_reimbursements,
        }
    }
}

/// Own-project figures for project managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManagerSummary {
    /// Projects created by the caller.
    pub total_projects: u64,
    /// Of those, ACTIVE ones.
    pub active_projects: u64,
    /// INCOME invoice totals on the caller's projects.
    #[serde(with = "rust_decimal::serde::float")]
    pub invoiced_income: Decimal,
}

/// Own-claim figures for employees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EmployeeSummary {
    pub total_reimbursements: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub paid: u64,
    /// Sum of APPROVED claims not yet paid out.
    #[serde(with = "rust_decimal::serde::float")]
    pub awaiting_payment: Decimal,
}

impl EmployeeSummary {
    /// Tallies the caller's claims from `(status, count, total)` groups.
    pub fn from_claims<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = (ReimbursementStatus, u64, Decimal)>,
    {
        groups
            .into_iter()
            .fold(Self::default(), |mut acc, (status, count, total)| {
                acc.total_reimbursements += count;
                match status {
                    ReimbursementStatus::Pending => acc.pending += count,
                    ReimbursementStatus::Approved => {
                        acc.approved += count;
                        acc.awaiting_payment += total;
                    }
                    ReimbursementStatus::Rejected => acc.rejected += count,
                    ReimbursementStatus::Paid => acc.paid += count,
                }
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_finance_profit_can_be_negative() {
        let summary = FinanceSummary::new(dec!(100), dec!(250.50), 3, 1);
        assert_eq!(summary.profit, dec!(-150.50));
    }

    #[test]
    fn test_employee_summary_from_claims() {
        let summary = EmployeeSummary::from_claims(vec![
            (ReimbursementStatus::Pending, 1, dec!(10)),
            (ReimbursementStatus::Approved, 2, dec!(25.25)),
            (ReimbursementStatus::Paid, 1, dec!(99)),
            (ReimbursementStatus::Rejected, 1, dec!(1)),
        ]);

        assert_eq!(summary.total_reimbursements, 5);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.approved, 2);
        assert_eq!(summary.paid, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.awaiting_payment, dec!(25.25));
    }

    #[test]
    fn test_role_summary_is_untagged() {
        let json = serde_json::to_value(RoleSummary::ProjectManager(ProjectManagerSummary {
            total_projects: 2,
            active_projects: 1,
            invoiced_income: dec!(1500),
        }))
        .unwrap();

        assert_eq!(json["totalProjects"], 2);
        assert!(json["invoicedIncome"].is_number());
    }

    #[test]
    fn test_dashboard_field_names() {
        let dashboard = FinanceDashboard {
            monthly_income: Vec::new(),
            monthly_expense: Vec::new(),
            outstanding_invoices: 0,
            outstanding_amount: Decimal::ZERO,
            overdue_invoices: 0,
            total_paid_invoices: 4,
            recent_invoices: Vec::new(),
            reimbursements_by_status: Vec::new(),
            expenses_by_category: Vec::new(),
        }
        .with_outstanding(OutstandingSummary {
            count: 2,
            amount: dec!(75),
            overdue: 1,
        });

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["outstandingInvoices"], 2);
        assert_eq!(json["overdueInvoices"], 1);
        assert_eq!(json["totalPaidInvoices"], 4);
        assert!(json["expensesByCategory"].is_array());
    }
}
