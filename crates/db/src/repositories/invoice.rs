//! Invoice repository.
//!
//! Creation issues the document number and inserts the invoice in one
//! transaction. Reads are scoped by the caller's visibility condition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::access::{AccessError, Principal, Resource, scope};
use opsledger_core::invoice::{InvoiceService, InvoiceStatus, InvoiceType, Patch};
use opsledger_core::numbering::{NumberingError, Period};
use opsledger_core::totals::{MONEY_SCALE, compute_totals};
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::{
    categories, files, invoice_attachments, invoices, projects, taxes, users, vendors,
};
use crate::visibility::invoice_condition;

use super::counter::{self, CounterError};
use super::{escape_like, is_unique_violation};

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    NotFound(Uuid),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    ReferenceNotFound {
        /// Kind of the referenced record.
        entity: &'static str,
        /// The missing id.
        id: Uuid,
    },

    /// Amount is not positive or has too many decimal places.
    #[error("{0}")]
    InvalidAmount(String),

    /// The issued number collided with an existing invoice.
    #[error("Invoice number '{0}' already exists")]
    DuplicateNumber(String),

    /// File already attached to this invoice.
    #[error("File {0} is already attached")]
    DuplicateAttachment(Uuid),

    /// Caller may not see the invoice.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Number generation failed.
    #[error(transparent)]
    Numbering(#[from] NumberingError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CounterError> for InvoiceError {
    fn from(err: CounterError) -> Self {
        match err {
            CounterError::Numbering(e) => Self::Numbering(e),
            CounterError::Database(e) => Self::Database(e),
        }
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::NotFound(_) | InvoiceError::ReferenceNotFound { .. } => {
                Self::NotFound(err.to_string())
            }
            InvoiceError::InvalidAmount(msg) => Self::field("amount", msg),
            InvoiceError::DuplicateNumber(_) | InvoiceError::DuplicateAttachment(_) => {
                Self::Conflict(err.to_string())
            }
            InvoiceError::Access(e) => e.into(),
            InvoiceError::Numbering(e) => e.into(),
            InvoiceError::Database(e) => {
                error!(error = %e, "invoice query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Direction; selects the number prefix.
    pub invoice_type: InvoiceType,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Linked vendor.
    pub vendor_id: Option<Uuid>,
    /// Category.
    pub category_id: Uuid,
    /// Tax applied to the amount.
    pub tax_id: Option<Uuid>,
    /// Base amount, before tax.
    pub amount: Decimal,
    /// Initial status (UNPAID when absent).
    pub status: Option<InvoiceStatus>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Free text.
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceInput {
    /// New direction. A different direction reissues the number.
    pub invoice_type: Option<InvoiceType>,
    /// Project link.
    pub project_id: Patch<Uuid>,
    /// Vendor link.
    pub vendor_id: Patch<Uuid>,
    /// New category.
    pub category_id: Option<Uuid>,
    /// Tax link; clearing it drops the tax from the totals.
    pub tax_id: Patch<Uuid>,
    /// New base amount.
    pub amount: Option<Decimal>,
    /// New status.
    pub status: Option<InvoiceStatus>,
    /// Due date.
    pub due_date: Patch<DateTime<Utc>>,
    /// Notes.
    pub notes: Patch<String>,
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Only invoices of this project.
    pub project_id: Option<Uuid>,
    /// Only this direction.
    pub invoice_type: Option<InvoiceType>,
    /// Only this status.
    pub status: Option<InvoiceStatus>,
    /// Case-insensitive match on number or notes.
    pub search: Option<String>,
}

/// An invoice with its related records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDetail {
    /// The invoice.
    pub invoice: invoices::Model,
    /// Linked project.
    pub project: Option<projects::Model>,
    /// Linked vendor.
    pub vendor: Option<vendors::Model>,
    /// Category.
    pub category: Option<categories::Model>,
    /// Applied tax.
    pub tax: Option<taxes::Model>,
    /// Creator.
    pub created_by: Option<users::Model>,
    /// Attached files, oldest first.
    pub attachments: Vec<files::Model>,
}

/// Rejects non-positive amounts and amounts finer than the money scale.
///
/// # Errors
///
/// Returns `InvoiceError::InvalidAmount` when the amount is unusable.
pub fn validate_amount(amount: Decimal) -> Result<(), InvoiceError> {
    if amount <= Decimal::ZERO {
        return Err(InvoiceError::InvalidAmount(
            "amount must be greater than 0".to_string(),
        ));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(InvoiceError::InvalidAmount(format!(
            "amount has more than {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Invoice repository.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an invoice with the next number of its type and month.
    ///
    /// `now` decides the numbering period and the creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is invalid
    /// - A referenced project, vendor, category or tax does not exist
    /// - The issued number collides with an existing one
    /// - Database operation fails
    pub async fn create(
        &self,
        created_by: Uuid,
        input: CreateInvoiceInput,
        now: DateTime<Utc>,
    ) -> Result<invoices::Model, InvoiceError> {
        validate_amount(input.amount)?;

        let txn = self.db.begin().await?;

        let refs = References {
            project_id: input.project_id,
            vendor_id: input.vendor_id,
            category_id: Some(input.category_id),
            tax_id: input.tax_id,
        };
        let tax = refs.check(&txn).await?;
        let totals = compute_totals(input.amount, tax.map(|t| t.percentage));
        let status = InvoiceService::initial_status(input.status, now);

        let number = counter::next_number(
            &txn,
            input.invoice_type.document_kind(),
            Period::containing(now),
        )
        .await?;
        let invoice_number = number.to_string();

        let timestamp = now.into();
        let invoice = invoices::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(invoice_number.clone()),
            invoice_type: Set(input.invoice_type.into()),
            status: Set(status.new_status.into()),
            amount: Set(input.amount),
            tax_amount: Set(totals.tax_amount),
            total_amount: Set(totals.total_amount),
            project_id: Set(input.project_id),
            vendor_id: Set(input.vendor_id),
            category_id: Set(input.category_id),
            tax_id: Set(input.tax_id),
            due_date: Set(input.due_date.map(Into::into)),
            paid_at: Set(status.paid_at.map(Into::into)),
            notes: Set(input.notes),
            created_by_id: Set(created_by),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        };

        let invoice = invoice.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                InvoiceError::DuplicateNumber(invoice_number.clone())
            } else {
                InvoiceError::Database(e)
            }
        })?;

        txn.commit().await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Lists invoices visible to `principal`, newest first.
    ///
    /// The page and the count share one condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: InvoiceFilter,
        page: PageRequest,
    ) -> Result<PageResponse<invoices::Model>, InvoiceError> {
        let page = page.normalized();
        let mut condition = invoice_condition(scope(principal, Resource::Invoice));

        if let Some(project_id) = filter.project_id {
            condition = condition.add(invoices::Column::ProjectId.eq(project_id));
        }
        if let Some(invoice_type) = filter.invoice_type {
            condition = condition
                .add(invoices::Column::InvoiceType.eq(db_enums::InvoiceType::from(invoice_type)));
        }
        if let Some(status) = filter.status {
            condition =
                condition.add(invoices::Column::Status.eq(db_enums::InvoiceStatus::from(status)));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::col((invoices::Entity, invoices::Column::InvoiceNumber))
                            .ilike(pattern.as_str()),
                    )
                    .add(Expr::col((invoices::Entity, invoices::Column::Notes)).ilike(pattern.as_str())),
            );
        }

        let total = invoices::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;

        let rows = invoices::Entity::find()
            .filter(condition)
            .order_by_desc(invoices::Column::CreatedAt)
            .order_by_desc(invoices::Column::InvoiceNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Loads an invoice and its related records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the id does not exist and `Access` when it
    /// exists outside the caller's scope.
    pub async fn find_one(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<InvoiceDetail, InvoiceError> {
        let txn = self.db.begin().await?;

        let invoice = invoices::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let scope = scope(principal, Resource::Invoice);
        if !scope.is_unrestricted() {
            let visible = invoices::Entity::find_by_id(id)
                .filter(invoice_condition(scope))
                .count(&txn)
                .await?;
            if visible == 0 {
                return Err(AccessError::OutOfScope(Resource::Invoice.name()).into());
            }
        }

        let project = match invoice.project_id {
            Some(pid) => projects::Entity::find_by_id(pid).one(&txn).await?,
            None => None,
        };
        let vendor = match invoice.vendor_id {
            Some(vid) => vendors::Entity::find_by_id(vid).one(&txn).await?,
            None => None,
        };
        let tax = match invoice.tax_id {
            Some(tid) => taxes::Entity::find_by_id(tid).one(&txn).await?,
            None => None,
        };
        let category = categories::Entity::find_by_id(invoice.category_id)
            .one(&txn)
            .await?;
        let created_by = users::Entity::find_by_id(invoice.created_by_id)
            .one(&txn)
            .await?;
        let attachments = invoice
            .find_related(invoice_attachments::Entity)
            .order_by_asc(invoice_attachments::Column::CreatedAt)
            .find_also_related(files::Entity)
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|(_, file)| file)
            .collect();

        txn.commit().await?;

        Ok(InvoiceDetail {
            invoice,
            project,
            vendor,
            category,
            tax,
            created_by,
            attachments,
        })
    }

    /// Applies a partial update and recomputes the totals.
    ///
    /// Totals use the effective amount and tax: the new value when given,
    /// the stored one otherwise. Changing the direction issues a new number
    /// with the matching prefix, in the period the invoice was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice or a referenced record does not exist,
    /// the amount is invalid, or the database operation fails.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateInvoiceInput,
        now: DateTime<Utc>,
    ) -> Result<invoices::Model, InvoiceError> {
        if let Some(amount) = input.amount {
            validate_amount(amount)?;
        }

        let txn = self.db.begin().await?;

        let invoice = invoices::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let project_id = input.project_id.apply(invoice.project_id);
        let vendor_id = input.vendor_id.apply(invoice.vendor_id);
        let tax_id = input.tax_id.apply(invoice.tax_id);
        let category_id = input.category_id.unwrap_or(invoice.category_id);
        let amount = input.amount.unwrap_or(invoice.amount);

        let refs = References {
            project_id,
            vendor_id,
            category_id: Some(category_id),
            tax_id,
        };
        let tax = refs.check(&txn).await?;
        let totals = compute_totals(amount, tax.map(|t| t.percentage));

        let due_date = input
            .due_date
            .apply(invoice.due_date.map(|d| d.with_timezone(&Utc)));
        let notes = input.notes.apply(invoice.notes.clone());

        let current_type = InvoiceType::from(invoice.invoice_type);
        let renumber = input
            .invoice_type
            .filter(|invoice_type| *invoice_type != current_type);
        let reissued = match renumber {
            Some(invoice_type) => {
                let period = Period::containing(invoice.created_at.with_timezone(&Utc));
                let number = counter::next_number(&txn, invoice_type.document_kind(), period).await?;
                Some((invoice_type, number.to_string()))
            }
            None => None,
        };
        let previous_number = invoice.invoice_number.clone();

        let mut active: invoices::ActiveModel = invoice.into();
        if let Some((invoice_type, number)) = &reissued {
            active.invoice_type = Set((*invoice_type).into());
            active.invoice_number = Set(number.clone());
        }
        if let Some(status) = input.status {
            let change = InvoiceService::change_status(status, now);
            active.status = Set(change.new_status.into());
            active.paid_at = Set(change.paid_at.map(Into::into));
        }
        active.project_id = Set(project_id);
        active.vendor_id = Set(vendor_id);
        active.category_id = Set(category_id);
        active.tax_id = Set(tax_id);
        active.amount = Set(amount);
        active.tax_amount = Set(totals.tax_amount);
        active.total_amount = Set(totals.total_amount);
        active.due_date = Set(due_date.map(Into::into));
        active.notes = Set(notes);
        active.updated_at = Set(now.into());

        let updated = active.update(&txn).await.map_err(|e| match &reissued {
            Some((_, number)) if is_unique_violation(&e) => {
                InvoiceError::DuplicateNumber(number.clone())
            }
            _ => InvoiceError::Database(e),
        })?;
        txn.commit().await?;

        if reissued.is_some() {
            info!(
                invoice_id = %updated.id,
                from = %previous_number,
                to = %updated.invoice_number,
                "invoice renumbered after direction change"
            );
        }
        info!(invoice_id = %updated.id, total = %updated.total_amount, "invoice updated");
        Ok(updated)
    }

    /// Moves an invoice to `status`, stamping or clearing `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice does not exist or the update fails.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<invoices::Model, InvoiceError> {
        let invoice = invoices::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let previous = InvoiceStatus::from(invoice.status);
        let change = InvoiceService::change_status(status, now);

        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(change.new_status.into());
        active.paid_at = Set(change.paid_at.map(Into::into));
        active.updated_at = Set(now.into());

        let updated = active.update(&self.db).await?;

        info!(invoice_id = %id, from = %previous, to = %status, "invoice status changed");
        Ok(updated)
    }

    /// Deletes an invoice unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice does not exist or the delete fails.
    pub async fn delete(&self, id: Uuid) -> Result<(), InvoiceError> {
        let result = invoices::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(InvoiceError::NotFound(id));
        }

        info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }

    /// Links a stored file to an invoice.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice or file does not exist, the file is
    /// already attached, or the insert fails.
    pub async fn add_attachment(
        &self,
        id: Uuid,
        file_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<invoice_attachments::Model, InvoiceError> {
        if invoices::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(InvoiceError::NotFound(id));
        }
        if files::Entity::find_by_id(file_id).one(&self.db).await?.is_none() {
            return Err(InvoiceError::ReferenceNotFound {
                entity: "file",
                id: file_id,
            });
        }

        let attachment = invoice_attachments::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(id),
            file_id: Set(file_id),
            created_at: Set(now.into()),
        };

        attachment.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                InvoiceError::DuplicateAttachment(file_id)
            } else {
                InvoiceError::Database(e)
            }
        })
    }
}

/// Optional references written with an invoice.
struct References {
    project_id: Option<Uuid>,
    vendor_id: Option<Uuid>,
    category_id: Option<Uuid>,
    tax_id: Option<Uuid>,
}

impl References {
    /// Verifies every reference exists and returns the tax, if any.
    async fn check<C: ConnectionTrait>(&self, db: &C) -> Result<Option<taxes::Model>, InvoiceError> {
        if let Some(id) = self.project_id
            && projects::Entity::find_by_id(id).one(db).await?.is_none()
        {
            return Err(InvoiceError::ReferenceNotFound { entity: "project", id });
        }
        if let Some(id) = self.vendor_id
            && vendors::Entity::find_by_id(id).one(db).await?.is_none()
        {
            return Err(InvoiceError::ReferenceNotFound { entity: "vendor", id });
        }
        if let Some(id) = self.category_id
            && categories::Entity::find_by_id(id).one(db).await?.is_none()
        {
            return Err(InvoiceError::ReferenceNotFound { entity: "category", id });
        }
        match self.tax_id {
            Some(id) => taxes::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(Some)
                .ok_or(InvoiceError::ReferenceNotFound { entity: "tax", id }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(1_000_000)).is_ok());
        assert!(validate_amount(dec!(0.0001)).is_ok());
        assert!(validate_amount(dec!(12.50000)).is_ok());
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(InvoiceError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(dec!(-5)),
            Err(InvoiceError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(dec!(1.00001)),
            Err(InvoiceError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_error_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::from(InvoiceError::NotFound(id)).status_code(), 404);
        assert_eq!(
            AppError::from(InvoiceError::ReferenceNotFound { entity: "tax", id }).status_code(),
            404
        );
        assert_eq!(
            AppError::from(InvoiceError::DuplicateNumber("INC-202401-0001".into())).status_code(),
            409
        );
        assert_eq!(
            AppError::from(InvoiceError::Access(AccessError::OutOfScope("invoice"))).status_code(),
            403
        );
        let err = AppError::from(InvoiceError::InvalidAmount("bad".into()));
        assert!(matches!(err, AppError::Validation { ref errors, .. } if errors[0].field == "amount"));
    }
}
