//! Row visibility per role.

use uuid::Uuid;

use super::role::{Principal, Role};

/// A resource whose rows are filtered by caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Invoices.
    Invoice,
    /// Reimbursement claims.
    Reimbursement,
    /// Projects.
    Project,
    /// Tasks inside projects.
    Task,
}

impl Resource {
    /// Lowercase name for messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Reimbursement => "reimbursement",
            Self::Project => "project",
            Self::Task => "task",
        }
    }
}

/// Which rows of a resource are visible.
///
/// The same scope drives page queries, count queries and single-record
/// checks, so paging metadata never disagrees with the rows returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every row.
    All,
    /// Rows linked to a project created by this user.
    ProjectOwnedBy(Uuid),
    /// Rows submitted by this user.
    SubmittedBy(Uuid),
    /// Rows created by this user.
    CreatedBy(Uuid),
    /// Projects this user is a member of.
    MemberOf(Uuid),
    /// Rows assigned to this user.
    AssignedTo(Uuid),
    /// No rows.
    Nothing,
}

impl Scope {
    /// Whether the scope admits every row.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Visibility scope of `principal` over `resource`.
#[must_use]
pub fn scope(principal: &Principal, resource: Resource) -> Scope {
    let user = principal.user_id;

    match (principal.role, resource) {
        (Role::Admin | Role::Finance, _) => Scope::All,

        (Role::ProjectManager, Resource::Invoice) => Scope::ProjectOwnedBy(user),
        (Role::ProjectManager, Resource::Reimbursement) => Scope::SubmittedBy(user),
        (Role::ProjectManager, Resource::Project) => Scope::CreatedBy(user),
        (Role::ProjectManager, Resource::Task) => Scope::ProjectOwnedBy(user),

        (Role::Employees, Resource::Invoice) => Scope::Nothing,
        (Role::Employees, Resource::Reimbursement) => Scope::SubmittedBy(user),
        (Role::Employees, Resource::Project) => Scope::MemberOf(user),
        (Role::Employees, Resource::Task) => Scope::AssignedTo(user),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Resource::Invoice)]
    #[case(Resource::Reimbursement)]
    #[case(Resource::Project)]
    #[case(Resource::Task)]
    fn test_admin_and_finance_see_all(#[case] resource: Resource) {
        for role in [Role::Admin, Role::Finance] {
            let principal = Principal::new(Uuid::new_v4(), role);
            assert_eq!(scope(&principal, resource), Scope::All);
        }
    }

    #[test]
    fn test_project_manager_scopes() {
        let user = Uuid::new_v4();
        let pm = Principal::new(user, Role::ProjectManager);
        assert_eq!(scope(&pm, Resource::Invoice), Scope::ProjectOwnedBy(user));
        assert_eq!(scope(&pm, Resource::Reimbursement), Scope::SubmittedBy(user));
        assert_eq!(scope(&pm, Resource::Project), Scope::CreatedBy(user));
        assert_eq!(scope(&pm, Resource::Task), Scope::ProjectOwnedBy(user));
    }

    #[test]
    fn test_employee_scopes() {
        let user = Uuid::new_v4();
        let employee = Principal::new(user, Role::Employees);
        assert_eq!(scope(&employee, Resource::Invoice), Scope::Nothing);
        assert_eq!(
            scope(&employee, Resource::Reimbursement),
            Scope::SubmittedBy(user)
        );
        assert_eq!(scope(&employee, Resource::Project), Scope::MemberOf(user));
        assert_eq!(scope(&employee, Resource::Task), Scope::AssignedTo(user));
    }

    #[test]
    fn test_unrestricted() {
        assert!(Scope::All.is_unrestricted());
        assert!(!Scope::Nothing.is_unrestricted());
        assert!(!Scope::SubmittedBy(Uuid::nil()).is_unrestricted());
    }
}
