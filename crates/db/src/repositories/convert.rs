//! Conversions between domain enums and their Postgres counterparts.

use opsledger_core::access::Role;
use opsledger_core::invoice::{InvoiceStatus, InvoiceType};
use opsledger_core::notification::NotificationKind;
use opsledger_core::reimbursement::ReimbursementStatus;
use opsledger_core::task::{TaskPriority, TaskStatus};

use crate::entities::sea_orm_active_enums as db;

impl From<InvoiceType> for db::InvoiceType {
    fn from(value: InvoiceType) -> Self {
        match value {
            InvoiceType::Income => Self::Income,
            InvoiceType::Expense => Self::Expense,
        }
    }
}

impl From<db::InvoiceType> for InvoiceType {
    fn from(value: db::InvoiceType) -> Self {
        match value {
            db::InvoiceType::Income => Self::Income,
            db::InvoiceType::Expense => Self::Expense,
        }
    }
}

impl From<InvoiceStatus> for db::InvoiceStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Unpaid => Self::Unpaid,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Debt => Self::Debt,
        }
    }
}

impl From<db::InvoiceStatus> for InvoiceStatus {
    fn from(value: db::InvoiceStatus) -> Self {
        match value {
            db::InvoiceStatus::Unpaid => Self::Unpaid,
            db::InvoiceStatus::Paid => Self::Paid,
            db::InvoiceStatus::Debt => Self::Debt,
        }
    }
}

impl From<ReimbursementStatus> for db::ReimbursementStatus {
    fn from(value: ReimbursementStatus) -> Self {
        match value {
            ReimbursementStatus::Pending => Self::Pending,
            ReimbursementStatus::Approved => Self::Approved,
            ReimbursementStatus::Rejected => Self::Rejected,
            ReimbursementStatus::Paid => Self::Paid,
        }
    }
}

impl From<db::ReimbursementStatus> for ReimbursementStatus {
    fn from(value: db::ReimbursementStatus) -> Self {
        match value {
            db::ReimbursementStatus::Pending => Self::Pending,
            db::ReimbursementStatus::Approved => Self::Approved,
            db::ReimbursementStatus::Rejected => Self::Rejected,
            db::ReimbursementStatus::Paid => Self::Paid,
        }
    }
}

impl From<Role> for db::UserRole {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => Self::Admin,
            Role::Finance => Self::Finance,
            Role::ProjectManager => Self::Projectmanager,
            Role::Employees => Self::Employees,
        }
    }
}

impl From<db::UserRole> for Role {
    fn from(value: db::UserRole) -> Self {
        match value {
            db::UserRole::Admin => Self::Admin,
            db::UserRole::Finance => Self::Finance,
            db::UserRole::Projectmanager => Self::ProjectManager,
            db::UserRole::Employees => Self::Employees,
        }
    }
}

impl From<NotificationKind> for db::NotificationType {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::ReimbursementApproved => Self::ReimbursementApproved,
            NotificationKind::ReimbursementRejected => Self::ReimbursementRejected,
            NotificationKind::ReimbursementPaid => Self::ReimbursementPaid,
            NotificationKind::General => Self::General,
        }
    }
}

impl From<TaskStatus> for db::TaskStatus {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Submitted => Self::Submitted,
            TaskStatus::Revision => Self::Revision,
            TaskStatus::Done => Self::Done,
        }
    }
}

impl From<db::TaskStatus> for TaskStatus {
    fn from(value: db::TaskStatus) -> Self {
        match value {
            db::TaskStatus::Todo => Self::Todo,
            db::TaskStatus::InProgress => Self::InProgress,
            db::TaskStatus::Submitted => Self::Submitted,
            db::TaskStatus::Revision => Self::Revision,
            db::TaskStatus::Done => Self::Done,
        }
    }
}

impl From<TaskPriority> for db::TaskPriority {
    fn from(value: TaskPriority) -> Self {
        match value {
            TaskPriority::Low => Self::Low,
            TaskPriority::Medium => Self::Medium,
            TaskPriority::High => Self::High,
            TaskPriority::Urgent => Self::Urgent,
        }
    }
}

impl From<db::TaskPriority> for TaskPriority {
    fn from(value: db::TaskPriority) -> Self {
        match value {
            db::TaskPriority::Low => Self::Low,
            db::TaskPriority::Medium => Self::Medium,
            db::TaskPriority::High => Self::High,
            db::TaskPriority::Urgent => Self::Urgent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reimbursement_status_round_trips() {
        for status in ReimbursementStatus::ALL {
            let stored: db::ReimbursementStatus = status.into();
            assert_eq!(ReimbursementStatus::from(stored), status);
        }
    }

    #[test]
    fn test_task_status_round_trips() {
        for status in TaskStatus::ALL {
            let stored: db::TaskStatus = status.into();
            assert_eq!(TaskStatus::from(stored), status);
        }
    }

    #[test]
    fn test_project_manager_maps_to_single_word_enum() {
        assert_eq!(
            db::UserRole::from(Role::ProjectManager),
            db::UserRole::Projectmanager
        );
    }
}
