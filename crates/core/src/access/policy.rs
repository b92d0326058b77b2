//! Operation allow-lists.

use super::error::AccessError;
use super::role::{Principal, Role};

/// Every guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an invoice.
    InvoiceCreate,
    /// List invoices.
    InvoiceList,
    /// View one invoice.
    InvoiceView,
    /// Edit an invoice.
    InvoiceUpdate,
    /// Change an invoice's payment status.
    InvoiceUpdateStatus,
    /// Attach a file to an invoice.
    InvoiceAttach,
    /// Delete an invoice.
    InvoiceDelete,
    /// Submit a reimbursement claim.
    ReimbursementCreate,
    /// List reimbursement claims.
    ReimbursementList,
    /// View one reimbursement claim.
    ReimbursementView,
    /// Attach a receipt to a claim.
    ReimbursementAttach,
    /// Approve a claim.
    ReimbursementApprove,
    /// Reject a claim.
    ReimbursementReject,
    /// Mark a claim as paid.
    ReimbursementMarkPaid,
    /// Finance dashboard.
    FinanceDashboard,
    /// Role-specific summary.
    DashboardSummary,
    /// Read categories and taxes.
    CatalogRead,
    /// Create, edit or delete categories.
    CategoryWrite,
    /// Create, edit or delete taxes.
    TaxWrite,
    /// Read vendors.
    VendorRead,
    /// Create or edit vendors.
    VendorWrite,
    /// Delete vendors.
    VendorDelete,
    /// Create a project.
    ProjectCreate,
    /// List projects.
    ProjectList,
    /// View one project.
    ProjectView,
    /// Edit a project.
    ProjectUpdate,
    /// Add or remove project members.
    ProjectManageMembers,
    /// Delete a project.
    ProjectDelete,
    /// Upload, edit or delete project documents.
    ProjectDocumentWrite,
    /// Record a project activity.
    ProjectActivityCreate,
    /// Edit or delete project activities.
    ProjectActivityManage,
    /// Create a task inside a project.
    TaskCreate,
    /// List tasks.
    TaskList,
    /// View one task.
    TaskView,
    /// Edit a task.
    TaskUpdate,
    /// Move a task through its workflow.
    TaskUpdateStatus,
    /// Delete a task.
    TaskDelete,
    /// List and view teams.
    TeamRead,
    /// Create or edit teams and their members.
    TeamWrite,
    /// Delete a team.
    TeamDelete,
    /// Read calendar events.
    CalendarView,
    /// Read file metadata and download links.
    FileView,
    /// Delete a stored file.
    FileDelete,
}

const ALL: &[Role] = &Role::ALL;
const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_FINANCE: &[Role] = &[Role::Admin, Role::Finance];
const ADMIN_FINANCE_PM: &[Role] = &[Role::Admin, Role::Finance, Role::ProjectManager];
const ADMIN_PM: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Roles allowed to perform `operation`.
#[must_use]
pub const fn allowed_roles(operation: Operation) -> &'static [Role] {
    use Operation as Op;

    match operation {
        Op::InvoiceCreate | Op::InvoiceUpdate | Op::InvoiceUpdateStatus | Op::InvoiceAttach => {
            ADMIN_FINANCE
        }
        Op::InvoiceList | Op::InvoiceView => ADMIN_FINANCE_PM,
        Op::InvoiceDelete => ADMIN,

        Op::ReimbursementCreate
        | Op::ReimbursementList
        | Op::ReimbursementView
        | Op::ReimbursementAttach => ALL,
        Op::ReimbursementApprove | Op::ReimbursementReject | Op::ReimbursementMarkPaid => {
            ADMIN_FINANCE
        }

        Op::FinanceDashboard => ADMIN_FINANCE,
        Op::DashboardSummary => ALL,

        Op::CatalogRead => ALL,
        Op::CategoryWrite | Op::TaxWrite => ADMIN,
        Op::VendorRead | Op::VendorWrite => ADMIN_FINANCE,
        Op::VendorDelete => ADMIN,

        Op::ProjectCreate | Op::ProjectUpdate | Op::ProjectManageMembers => ADMIN_PM,
        Op::ProjectList | Op::ProjectView => ALL,
        Op::ProjectDelete => ADMIN,
        Op::ProjectDocumentWrite | Op::ProjectActivityManage => ADMIN_PM,
        Op::ProjectActivityCreate => ALL,

        Op::TaskCreate | Op::TaskUpdate | Op::TaskDelete => ADMIN_PM,
        Op::TaskList | Op::TaskView | Op::TaskUpdateStatus => ALL,

        Op::TeamRead => ALL,
        Op::TeamWrite => ADMIN_PM,
        Op::TeamDelete => ADMIN,

        Op::CalendarView => ALL,

        Op::FileView => ALL,
        Op::FileDelete => ADMIN,
    }
}

/// Checks that `principal` may perform `operation`.
///
/// # Errors
///
/// Returns `AccessError::RoleNotAllowed` when the role is not in the allow-list.
pub fn authorize(principal: &Principal, operation: Operation) -> Result<(), AccessError> {
    if allowed_roles(operation).contains(&principal.role) {
        Ok(())
    } else {
        Err(AccessError::RoleNotAllowed {
            role: principal.role,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), role)
    }

    #[rstest]
    #[case(Operation::InvoiceCreate, Role::Admin, true)]
    #[case(Operation::InvoiceCreate, Role::Finance, true)]
    #[case(Operation::InvoiceCreate, Role::ProjectManager, false)]
    #[case(Operation::InvoiceCreate, Role::Employees, false)]
    #[case(Operation::InvoiceList, Role::ProjectManager, true)]
    #[case(Operation::InvoiceList, Role::Employees, false)]
    #[case(Operation::InvoiceDelete, Role::Finance, false)]
    #[case(Operation::ReimbursementCreate, Role::Employees, true)]
    #[case(Operation::ReimbursementApprove, Role::Finance, true)]
    #[case(Operation::ReimbursementApprove, Role::ProjectManager, false)]
    #[case(Operation::ReimbursementMarkPaid, Role::Employees, false)]
    #[case(Operation::FinanceDashboard, Role::ProjectManager, false)]
    #[case(Operation::DashboardSummary, Role::Employees, true)]
    #[case(Operation::CategoryWrite, Role::Finance, false)]
    #[case(Operation::VendorWrite, Role::Finance, true)]
    #[case(Operation::VendorDelete, Role::Finance, false)]
    #[case(Operation::ProjectCreate, Role::ProjectManager, true)]
    #[case(Operation::ProjectCreate, Role::Finance, false)]
    #[case(Operation::ProjectDelete, Role::ProjectManager, false)]
    #[case(Operation::ProjectDocumentWrite, Role::Employees, false)]
    #[case(Operation::ProjectActivityCreate, Role::Employees, true)]
    #[case(Operation::ProjectActivityManage, Role::Finance, false)]
    #[case(Operation::TaskCreate, Role::ProjectManager, true)]
    #[case(Operation::TaskCreate, Role::Employees, false)]
    #[case(Operation::TaskList, Role::Employees, true)]
    #[case(Operation::TaskUpdateStatus, Role::Employees, true)]
    #[case(Operation::TaskDelete, Role::Finance, false)]
    #[case(Operation::TeamRead, Role::Employees, true)]
    #[case(Operation::TeamWrite, Role::ProjectManager, true)]
    #[case(Operation::TeamWrite, Role::Finance, false)]
    #[case(Operation::TeamDelete, Role::ProjectManager, false)]
    #[case(Operation::CalendarView, Role::Employees, true)]
    #[case(Operation::FileDelete, Role::Admin, true)]
    #[case(Operation::FileDelete, Role::Finance, false)]
    fn test_authorize(#[case] operation: Operation, #[case] role: Role, #[case] allowed: bool) {
        assert_eq!(authorize(&principal(role), operation).is_ok(), allowed);
    }

    #[test]
    fn test_admin_may_do_everything() {
        let admin = principal(Role::Admin);
        for operation in [
            Operation::InvoiceDelete,
            Operation::ReimbursementMarkPaid,
            Operation::TaxWrite,
            Operation::ProjectManageMembers,
            Operation::FileDelete,
        ] {
            assert!(authorize(&admin, operation).is_ok());
        }
    }

    #[test]
    fn test_denial_names_role_and_operation() {
        let err = authorize(&principal(Role::Employees), Operation::InvoiceDelete).unwrap_err();
        assert_eq!(
            err,
            AccessError::RoleNotAllowed {
                role: Role::Employees,
                operation: Operation::InvoiceDelete
            }
        );
    }
}
