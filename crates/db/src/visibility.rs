//! Translation of visibility scopes into SQL conditions.
//!
//! The same `Condition` is applied to page queries, count queries and
//! single-record checks.

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use opsledger_core::access::Scope;

use crate::entities::{invoices, project_members, projects, reimbursements, tasks};

/// Matches no rows.
fn deny() -> Condition {
    Condition::all().add(Expr::cust("FALSE"))
}

/// Ids of projects created by `user`.
pub(crate) fn projects_created_by(user: Uuid) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(projects::Column::Id)
        .from(projects::Entity)
        .and_where(projects::Column::CreatedById.eq(user))
        .to_owned()
}

/// Ids of projects `user` is a member of.
fn projects_joined_by(user: Uuid) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(project_members::Column::ProjectId)
        .from(project_members::Entity)
        .and_where(project_members::Column::UserId.eq(user))
        .to_owned()
}

/// Invoice rows visible under `scope`.
#[must_use]
pub fn invoice_condition(scope: Scope) -> Condition {
    match scope {
        Scope::All => Condition::all(),
        Scope::ProjectOwnedBy(user) => {
            Condition::all().add(invoices::Column::ProjectId.in_subquery(projects_created_by(user)))
        }
        Scope::CreatedBy(user) => Condition::all().add(invoices::Column::CreatedById.eq(user)),
        Scope::SubmittedBy(_) | Scope::MemberOf(_) | Scope::AssignedTo(_) | Scope::Nothing => {
            deny()
        }
    }
}

/// Reimbursement rows visible under `scope`.
#[must_use]
pub fn reimbursement_condition(scope: Scope) -> Condition {
    match scope {
        Scope::All => Condition::all(),
        Scope::SubmittedBy(user) => {
            Condition::all().add(reimbursements::Column::SubmittedById.eq(user))
        }
        Scope::ProjectOwnedBy(user) => Condition::all()
            .add(reimbursements::Column::ProjectId.in_subquery(projects_created_by(user))),
        Scope::CreatedBy(_) | Scope::MemberOf(_) | Scope::AssignedTo(_) | Scope::Nothing => {
            deny()
        }
    }
}

/// Project rows visible under `scope`.
#[must_use]
pub fn project_condition(scope: Scope) -> Condition {
    match scope {
        Scope::All => Condition::all(),
        Scope::CreatedBy(user) | Scope::ProjectOwnedBy(user) => {
            Condition::all().add(projects::Column::CreatedById.eq(user))
        }
        Scope::MemberOf(user) => {
            Condition::all().add(projects::Column::Id.in_subquery(projects_joined_by(user)))
        }
        Scope::SubmittedBy(_) | Scope::AssignedTo(_) | Scope::Nothing => deny(),
    }
}

/// Task rows visible under `scope`.
#[must_use]
pub fn task_condition(scope: Scope) -> Condition {
    match scope {
        Scope::All => Condition::all(),
        Scope::AssignedTo(user) => Condition::all().add(tasks::Column::AssignedToId.eq(user)),
        Scope::ProjectOwnedBy(user) => Condition::any()
            .add(tasks::Column::CreatedById.eq(user))
            .add(tasks::Column::ProjectId.in_subquery(projects_created_by(user))),
        Scope::CreatedBy(user) => Condition::all().add(tasks::Column::CreatedById.eq(user)),
        Scope::MemberOf(user) => {
            Condition::all().add(tasks::Column::ProjectId.in_subquery(projects_joined_by(user)))
        }
        Scope::SubmittedBy(_) | Scope::Nothing => deny(),
    }
}
