//! Reimbursement repository.
//!
//! Transitions lock the row, run the pure guard, then write, all inside one
//! transaction. Two concurrent approvals of the same claim therefore yield
//! one success and one conflict.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::access::{AccessError, Principal, Resource, scope};
use opsledger_core::notification::Notice;
use opsledger_core::reimbursement::{
    ReimbursementAction, ReimbursementService, ReimbursementStatus, TransitionError,
};
use opsledger_core::totals::MONEY_SCALE;
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::{
    categories, files, projects, reimbursement_attachments, reimbursements, users,
};
use crate::visibility::reimbursement_condition;

use super::is_unique_violation;

/// Error types for reimbursement operations.
#[derive(Debug, thiserror::Error)]
pub enum ReimbursementError {
    /// Reimbursement not found.
    #[error("Reimbursement not found: {0}")]
    NotFound(Uuid),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    ReferenceNotFound {
        /// Kind of the referenced record.
        entity: &'static str,
        /// The missing id.
        id: Uuid,
    },

    /// Amount is negative or has too many decimal places.
    #[error("{0}")]
    InvalidAmount(String),

    /// File already attached to this claim.
    #[error("File {0} is already attached")]
    DuplicateAttachment(Uuid),

    /// The guard refused the transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Caller may not see the claim.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ReimbursementError> for AppError {
    fn from(err: ReimbursementError) -> Self {
        match err {
            ReimbursementError::NotFound(_) | ReimbursementError::ReferenceNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            ReimbursementError::InvalidAmount(msg) => Self::field("amount", msg),
            ReimbursementError::DuplicateAttachment(_) => Self::Conflict(err.to_string()),
            ReimbursementError::Transition(e) => e.into(),
            ReimbursementError::Access(e) => e.into(),
            ReimbursementError::Database(e) => {
                error!(error = %e, "reimbursement query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Input for submitting a claim.
#[derive(Debug, Clone)]
pub struct CreateReimbursementInput {
    /// Short title.
    pub title: String,
    /// Details.
    pub description: Option<String>,
    /// Claimed amount.
    pub amount: Decimal,
    /// Category.
    pub category_id: Uuid,
    /// Project the expense belongs to.
    pub project_id: Option<Uuid>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct ReimbursementFilter {
    /// Only this status.
    pub status: Option<ReimbursementStatus>,
    /// Only claims of this project.
    pub project_id: Option<Uuid>,
}

/// A claim with its related records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReimbursementDetail {
    /// The claim.
    pub reimbursement: reimbursements::Model,
    /// Category.
    pub category: Option<categories::Model>,
    /// Linked project.
    pub project: Option<projects::Model>,
    /// Who submitted it.
    pub submitted_by: Option<users::Model>,
    /// Who approved or rejected it.
    pub approved_by: Option<users::Model>,
    /// Attached receipts, oldest first.
    pub attachments: Vec<files::Model>,
}

/// A persisted transition and the notice for the submitter.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The updated claim.
    pub reimbursement: reimbursements::Model,
    /// Notice to dispatch.
    pub notice: Notice,
}

/// Rejects negative amounts and amounts finer than the money scale.
///
/// # Errors
///
/// Returns `ReimbursementError::InvalidAmount` when the amount is unusable.
pub fn validate_amount(amount: Decimal) -> Result<(), ReimbursementError> {
    if amount < Decimal::ZERO {
        return Err(ReimbursementError::InvalidAmount(
            "amount must not be negative".to_string(),
        ));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ReimbursementError::InvalidAmount(format!(
            "amount has more than {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Reimbursement repository.
#[derive(Debug, Clone)]
pub struct ReimbursementRepository {
    db: DatabaseConnection,
}

impl ReimbursementRepository {
    /// Creates a new reimbursement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Submits a claim in PENDING status.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is invalid, the category or project
    /// does not exist, or the insert fails.
    pub async fn create(
        &self,
        submitted_by: Uuid,
        input: CreateReimbursementInput,
        now: DateTime<Utc>,
    ) -> Result<reimbursements::Model, ReimbursementError> {
        validate_amount(input.amount)?;

        if categories::Entity::find_by_id(input.category_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(ReimbursementError::ReferenceNotFound {
                entity: "category",
                id: input.category_id,
            });
        }
        if let Some(id) = input.project_id
            && projects::Entity::find_by_id(id).one(&self.db).await?.is_none()
        {
            return Err(ReimbursementError::ReferenceNotFound {
                entity: "project",
                id,
            });
        }

        let timestamp = now.into();
        let claim = reimbursements::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            description: Set(input.description),
            amount: Set(input.amount),
            category_id: Set(input.category_id),
            project_id: Set(input.project_id),
            status: Set(db_enums::ReimbursementStatus::Pending),
            submitted_by_id: Set(submitted_by),
            approved_by_id: Set(None),
            rejection_reason: Set(None),
            submitted_at: Set(timestamp),
            approved_at: Set(None),
            paid_at: Set(None),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        };

        let claim = claim.insert(&self.db).await?;

        info!(reimbursement_id = %claim.id, amount = %claim.amount, "reimbursement submitted");
        Ok(claim)
    }

    /// Lists claims visible to `principal`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: ReimbursementFilter,
        page: PageRequest,
    ) -> Result<PageResponse<reimbursements::Model>, ReimbursementError> {
        let page = page.normalized();
        let mut condition = reimbursement_condition(scope(principal, Resource::Reimbursement));

        if let Some(status) = filter.status {
            condition = condition
                .add(reimbursements::Column::Status.eq(db_enums::ReimbursementStatus::from(status)));
        }
        if let Some(project_id) = filter.project_id {
            condition = condition.add(reimbursements::Column::ProjectId.eq(project_id));
        }

        let total = reimbursements::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = reimbursements::Entity::find()
            .filter(condition)
            .order_by_desc(reimbursements::Column::SubmittedAt)
            .order_by_desc(reimbursements::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Loads a claim and its related records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id does not exist and `Access` when it
    /// exists outside the caller's scope.
    pub async fn find_one(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ReimbursementDetail, ReimbursementError> {
        let txn = self.db.begin().await?;

        let reimbursement = reimbursements::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ReimbursementError::NotFound(id))?;

        let scope = scope(principal, Resource::Reimbursement);
        if !scope.is_unrestricted() {
            let visible = reimbursements::Entity::find_by_id(id)
                .filter(reimbursement_condition(scope))
                .count(&txn)
                .await?;
            if visible == 0 {
                return Err(AccessError::OutOfScope(Resource::Reimbursement.name()).into());
            }
        }

        let category = categories::Entity::find_by_id(reimbursement.category_id)
            .one(&txn)
            .await?;
        let project = match reimbursement.project_id {
            Some(pid) => projects::Entity::find_by_id(pid).one(&txn).await?,
            None => None,
        };
        let submitted_by = users::Entity::find_by_id(reimbursement.submitted_by_id)
            .one(&txn)
            .await?;
        let approved_by = match reimbursement.approved_by_id {
            Some(uid) => users::Entity::find_by_id(uid).one(&txn).await?,
            None => None,
        };
        let attachments = reimbursement
            .find_related(reimbursement_attachments::Entity)
            .order_by_asc(reimbursement_attachments::Column::CreatedAt)
            .find_also_related(files::Entity)
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|(_, file)| file)
            .collect();

        txn.commit().await?;

        Ok(ReimbursementDetail {
            reimbursement,
            category,
            project,
            submitted_by,
            approved_by,
            attachments,
        })
    }

    /// Approves a PENDING claim.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a `Transition` conflict when the claim is not
    /// PENDING, or a database error.
    pub async fn approve(
        &self,
        id: Uuid,
        approver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReimbursementError> {
        self.transition(id, now, |current| {
            ReimbursementService::approve(current, approver, now)
        })
        .await
    }

    /// Rejects a PENDING claim with a reason.
    ///
    /// A blank reason fails before the claim is read.
    ///
    /// # Errors
    ///
    /// Returns `RejectionReasonRequired`, `NotFound`, a `Transition`
    /// conflict when the claim is not PENDING, or a database error.
    pub async fn reject(
        &self,
        id: Uuid,
        approver: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReimbursementError> {
        if reason.trim().is_empty() {
            return Err(TransitionError::RejectionReasonRequired.into());
        }

        self.transition(id, now, |current| {
            ReimbursementService::reject(current, approver, reason)
        })
        .await
    }

    /// Marks an APPROVED claim as paid.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, a `Transition` conflict when the claim is not
    /// APPROVED, or a database error.
    pub async fn mark_paid(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReimbursementError> {
        self.transition(id, now, |current| ReimbursementService::mark_paid(current, now))
            .await
    }

    async fn transition<F>(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        guard: F,
    ) -> Result<TransitionOutcome, ReimbursementError>
    where
        F: FnOnce(ReimbursementStatus) -> Result<ReimbursementAction, TransitionError>,
    {
        let txn = self.db.begin().await?;

        let claim = reimbursements::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ReimbursementError::NotFound(id))?;

        let current = ReimbursementStatus::from(claim.status);
        let action = guard(current)?;
        let new_status = action.new_status();

        let mut active: reimbursements::ActiveModel = claim.into();
        active.status = Set(new_status.into());
        match &action {
            ReimbursementAction::Approve {
                approved_by,
                approved_at,
            } => {
                active.approved_by_id = Set(Some(*approved_by));
                active.approved_at = Set(Some((*approved_at).into()));
            }
            ReimbursementAction::Reject {
                approved_by,
                rejection_reason,
            } => {
                active.approved_by_id = Set(Some(*approved_by));
                active.rejection_reason = Set(Some(rejection_reason.clone()));
            }
            ReimbursementAction::MarkPaid { paid_at } => {
                active.paid_at = Set(Some((*paid_at).into()));
            }
        }
        active.updated_at = Set(now.into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            reimbursement_id = %id,
            from = %current,
            to = %new_status,
            "reimbursement transitioned"
        );

        let notice = match action {
            ReimbursementAction::Approve { .. } => Notice::reimbursement_approved(
                updated.submitted_by_id,
                updated.id,
                &updated.title,
                updated.amount,
            ),
            ReimbursementAction::Reject {
                rejection_reason, ..
            } => Notice::reimbursement_rejected(
                updated.submitted_by_id,
                updated.id,
                &updated.title,
                &rejection_reason,
            ),
            ReimbursementAction::MarkPaid { .. } => Notice::reimbursement_paid(
                updated.submitted_by_id,
                updated.id,
                &updated.title,
                updated.amount,
            ),
        };

        Ok(TransitionOutcome {
            reimbursement: updated,
            notice,
        })
    }

    /// Links a stored file to a claim the caller can see.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim or file does not exist, the claim is
    /// outside the caller's scope, the file is already attached, or the
    /// insert fails.
    pub async fn add_attachment(
        &self,
        principal: &Principal,
        id: Uuid,
        file_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<reimbursement_attachments::Model, ReimbursementError> {
        if reimbursements::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(ReimbursementError::NotFound(id));
        }

        let scope = scope(principal, Resource::Reimbursement);
        if !scope.is_unrestricted() {
            let visible = reimbursements::Entity::find_by_id(id)
                .filter(reimbursement_condition(scope))
                .count(&self.db)
                .await?;
            if visible == 0 {
                return Err(AccessError::OutOfScope(Resource::Reimbursement.name()).into());
            }
        }

        if files::Entity::find_by_id(file_id).one(&self.db).await?.is_none() {
            return Err(ReimbursementError::ReferenceNotFound {
                entity: "file",
                id: file_id,
            });
        }

        let attachment = reimbursement_attachments::ActiveModel {
            id: Set(Uuid::new_v4()),
            reimbursement_id: Set(id),
            file_id: Set(file_id),
            created_at: Set(now.into()),
        };

        attachment.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                ReimbursementError::DuplicateAttachment(file_id)
            } else {
                ReimbursementError::Database(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount_allows_zero() {
        assert!(validate_amount(Decimal::ZERO).is_ok());
        assert!(validate_amount(dec!(125.5)).is_ok());
        assert!(matches!(
            validate_amount(dec!(-0.01)),
            Err(ReimbursementError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(dec!(3.14159)),
            Err(ReimbursementError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_transition_errors_map_to_http_codes() {
        let conflict = ReimbursementError::Transition(TransitionError::InvalidTransition {
            from: ReimbursementStatus::Paid,
            to: ReimbursementStatus::Approved,
        });
        assert_eq!(AppError::from(conflict).status_code(), 409);

        let missing_reason = ReimbursementError::Transition(TransitionError::RejectionReasonRequired);
        let err = AppError::from(missing_reason);
        assert_eq!(err.status_code(), 400);
        assert!(
            matches!(err, AppError::Validation { ref errors, .. } if errors[0].field == "rejectionReason")
        );
    }

    #[test]
    fn test_out_of_scope_is_forbidden() {
        let err = ReimbursementError::Access(AccessError::OutOfScope("reimbursement"));
        assert_eq!(AppError::from(err).status_code(), 403);
    }
}
