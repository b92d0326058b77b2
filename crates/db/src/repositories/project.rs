//! Project repository.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::access::{AccessError, Principal, Resource, scope};
use opsledger_core::invoice::Patch;
use opsledger_core::totals::ContractUtilization;
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::sea_orm_active_enums::{InvoiceType, ProjectStatus};
use crate::entities::{invoices, project_members, projects, users};
use crate::visibility::project_condition;

use super::{escape_like, is_unique_violation};

/// Member role given to the creator of a project.
pub const OWNER_ROLE: &str = "owner";

/// Member role used when none is given.
pub const DEFAULT_MEMBER_ROLE: &str = "member";

/// Error types for project operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Project not found.
    #[error("Project not found: {0}")]
    NotFound(Uuid),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// User is not a member of the project.
    #[error("User {0} is not a member of this project")]
    MemberNotFound(Uuid),

    /// Document not found in this project.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Activity not found in this project.
    #[error("Activity not found: {0}")]
    ActivityNotFound(Uuid),

    /// User is already a member of the project.
    #[error("User {0} is already a member of this project")]
    DuplicateMember(Uuid),

    /// Contract value is negative.
    #[error("Contract value must not be negative")]
    InvalidContractValue,

    /// End date precedes start date.
    #[error("End date must not be before start date")]
    InvalidDateRange,

    /// Caller may not see the project.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(_)
            | ProjectError::UserNotFound(_)
            | ProjectError::MemberNotFound(_)
            | ProjectError::DocumentNotFound(_)
            | ProjectError::ActivityNotFound(_) => Self::NotFound(err.to_string()),
            ProjectError::DuplicateMember(_) => Self::Conflict(err.to_string()),
            ProjectError::InvalidContractValue => Self::field("contractValue", err.to_string()),
            ProjectError::InvalidDateRange => Self::field("endDate", err.to_string()),
            ProjectError::Access(e) => e.into(),
            ProjectError::Database(e) => {
                error!(error = %e, "project query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Input for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    /// Project name.
    pub name: String,
    /// Client name.
    pub client_name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Contract ceiling for income invoices.
    pub contract_value: Option<Decimal>,
    /// Initial status (PLANNING when absent).
    pub status: Option<ProjectStatus>,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date.
    pub end_date: Option<NaiveDate>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectInput {
    /// New name.
    pub name: Option<String>,
    /// Client name.
    pub client_name: Patch<String>,
    /// Description.
    pub description: Patch<String>,
    /// Contract ceiling.
    pub contract_value: Patch<Decimal>,
    /// New status.
    pub status: Option<ProjectStatus>,
    /// Start date.
    pub start_date: Patch<NaiveDate>,
    /// End date.
    pub end_date: Patch<NaiveDate>,
}

/// A project member with the user record.
#[derive(Debug, Clone)]
pub struct ProjectMember {
    /// Membership row.
    pub membership: project_members::Model,
    /// The member.
    pub user: Option<users::Model>,
}

/// A project with members and contract utilization.
#[derive(Debug, Clone)]
pub struct ProjectDetail {
    /// The project.
    pub project: projects::Model,
    /// Members, in joining order.
    pub members: Vec<ProjectMember>,
    /// Income invoiced against the contract value, when one is set.
    pub utilization: Option<ContractUtilization>,
}

/// Project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a project; the creator joins it as owner in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or the insert fails.
    pub async fn create(
        &self,
        created_by: Uuid,
        input: CreateProjectInput,
        now: DateTime<Utc>,
    ) -> Result<projects::Model, ProjectError> {
        validate(input.contract_value, input.start_date, input.end_date)?;

        let txn = self.db.begin().await?;
        let timestamp = now.into();

        let project = projects::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            client_name: Set(input.client_name),
            description: Set(input.description),
            contract_value: Set(input.contract_value),
            status: Set(input.status.unwrap_or(ProjectStatus::Planning)),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            created_by_id: Set(created_by),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&txn)
        .await?;

        project_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project.id),
            user_id: Set(created_by),
            role: Set(OWNER_ROLE.to_string()),
            joined_at: Set(timestamp),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Lists projects visible to `principal`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        principal: &Principal,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<projects::Model>, ProjectError> {
        let page = page.normalized();
        let mut condition = project_condition(scope(principal, Resource::Project));
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition = condition
                .add(Expr::col((projects::Entity, projects::Column::Name)).ilike(pattern.as_str()));
        }

        let total = projects::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = projects::Entity::find()
            .filter(condition)
            .order_by_desc(projects::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Loads a project with members and contract utilization.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access` when out of scope, or a database error.
    pub async fn find_one(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ProjectDetail, ProjectError> {
        let txn = self.db.begin().await?;

        let project = visible_project(&txn, principal, id).await?;
        let members = load_members(&txn, id).await?;
        let utilization = match project.contract_value {
            Some(contract_value) => Some(ContractUtilization::new(
                contract_value,
                invoiced_income(&txn, id).await?,
            )),
            None => None,
        };

        txn.commit().await?;

        Ok(ProjectDetail {
            project,
            members,
            utilization,
        })
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access` when out of scope, a validation error,
    /// or a database error.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        input: UpdateProjectInput,
        now: DateTime<Utc>,
    ) -> Result<projects::Model, ProjectError> {
        let project = visible_project(&self.db, principal, id).await?;

        let contract_value = input.contract_value.apply(project.contract_value);
        let start_date = input.start_date.apply(project.start_date);
        let end_date = input.end_date.apply(project.end_date);
        validate(contract_value, start_date, end_date)?;

        let client_name = input.client_name.apply(project.client_name.clone());
        let description = input.description.apply(project.description.clone());

        let mut active: projects::ActiveModel = project.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        active.client_name = Set(client_name);
        active.description = Set(description);
        active.contract_value = Set(contract_value);
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;
        info!(project_id = %id, "project updated");
        Ok(updated)
    }

    /// Deletes a project. Its invoices and claims keep existing without a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn delete(&self, id: Uuid) -> Result<(), ProjectError> {
        let result = projects::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(ProjectError::NotFound(id));
        }

        info!(project_id = %id, "project deleted");
        Ok(())
    }

    /// Adds a user to a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `UserNotFound`, `DuplicateMember`,
    /// or a database error.
    pub async fn add_member(
        &self,
        principal: &Principal,
        project_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProjectMember, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(ProjectError::UserNotFound(user_id))?;

        let membership = project_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            role: Set(role.unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string())),
            joined_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProjectError::DuplicateMember(user_id)
            } else {
                ProjectError::Database(e)
            }
        })?;

        info!(project_id = %project_id, user_id = %user_id, "project member added");
        Ok(ProjectMember {
            membership,
            user: Some(user),
        })
    }

    /// Removes a user from a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, `MemberNotFound`, or a database error.
    pub async fn remove_member(
        &self,
        principal: &Principal,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ProjectError> {
        visible_project(&self.db, principal, project_id).await?;

        let result = project_members::Entity::delete_many()
            .filter(project_members::Column::ProjectId.eq(project_id))
            .filter(project_members::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ProjectError::MemberNotFound(user_id));
        }

        info!(project_id = %project_id, user_id = %user_id, "project member removed");
        Ok(())
    }

    /// Lists the members of a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Access`, or a database error.
    pub async fn list_members(
        &self,
        principal: &Principal,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>, ProjectError> {
        visible_project(&self.db, principal, project_id).await?;
        Ok(load_members(&self.db, project_id).await?)
    }

    /// Sum of INCOME invoice totals linked to a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn invoiced_income(&self, project_id: Uuid) -> Result<Decimal, ProjectError> {
        Ok(invoiced_income(&self.db, project_id).await?)
    }
}

fn validate(
    contract_value: Option<Decimal>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), ProjectError> {
    if contract_value.is_some_and(|v| v < Decimal::ZERO) {
        return Err(ProjectError::InvalidContractValue);
    }
    if let (Some(start), Some(end)) = (start_date, end_date)
        && end < start
    {
        return Err(ProjectError::InvalidDateRange);
    }
    Ok(())
}

/// Finds a project and checks it lies in the caller's scope.
pub(super) async fn visible_project<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> Result<projects::Model, ProjectError> {
    let project = projects::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ProjectError::NotFound(id))?;

    let scope = scope(principal, Resource::Project);
    if !scope.is_unrestricted() {
        let visible = projects::Entity::find_by_id(id)
            .filter(project_condition(scope))
            .count(db)
            .await?;
        if visible == 0 {
            return Err(AccessError::OutOfScope(Resource::Project.name()).into());
        }
    }

    Ok(project)
}

async fn load_members<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
) -> Result<Vec<ProjectMember>, DbErr> {
    Ok(project_members::Entity::find()
        .filter(project_members::Column::ProjectId.eq(project_id))
        .order_by_asc(project_members::Column::JoinedAt)
        .find_also_related(users::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(membership, user)| ProjectMember { membership, user })
        .collect())
}

async fn invoiced_income<C: ConnectionTrait>(db: &C, project_id: Uuid) -> Result<Decimal, DbErr> {
    let sum: Option<Option<Decimal>> = invoices::Entity::find()
        .filter(invoices::Column::ProjectId.eq(project_id))
        .filter(invoices::Column::InvoiceType.eq(InvoiceType::Income))
        .select_only()
        .column_as(invoices::Column::TotalAmount.sum(), "total")
        .into_tuple()
        .one(db)
        .await?;

    Ok(sum.flatten().unwrap_or(Decimal::ZERO))
}
