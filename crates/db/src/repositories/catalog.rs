//! Master data: categories, taxes and vendors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{error, info};
use uuid::Uuid;

use opsledger_core::invoice::Patch;
use opsledger_shared::AppError;
use opsledger_shared::types::{PageRequest, PageResponse};

use crate::entities::sea_orm_active_enums::CategoryType;
use crate::entities::{categories, taxes, vendors};

use super::{escape_like, is_foreign_key_violation};

/// Largest tax percentage.
const MAX_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

/// Decimal places stored for tax percentages.
const PERCENTAGE_SCALE: u32 = 2;

/// Error types for master data operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(Uuid),

    /// Tax not found.
    #[error("Tax not found: {0}")]
    TaxNotFound(Uuid),

    /// Vendor not found.
    #[error("Vendor not found: {0}")]
    VendorNotFound(Uuid),

    /// Percentage outside 0..=100 or too precise.
    #[error("Percentage must be between 0 and 100 with at most 2 decimal places")]
    InvalidPercentage,

    /// The record is still referenced by invoices, claims or vendors.
    #[error("{0} is still in use")]
    InUse(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CategoryNotFound(_)
            | CatalogError::TaxNotFound(_)
            | CatalogError::VendorNotFound(_) => Self::NotFound(err.to_string()),
            CatalogError::InvalidPercentage => Self::field("percentage", err.to_string()),
            CatalogError::InUse(_) => Self::Conflict(err.to_string()),
            CatalogError::Database(e) => {
                error!(error = %e, "catalog query failed");
                Self::Database(e.to_string())
            }
        }
    }
}

/// Input for a category.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    /// Name.
    pub name: String,
    /// INCOME or EXPENSE.
    pub category_type: CategoryType,
}

/// Partial category update.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    /// New name.
    pub name: Option<String>,
    /// New type.
    pub category_type: Option<CategoryType>,
}

/// Input for a tax.
#[derive(Debug, Clone)]
pub struct TaxInput {
    /// Name.
    pub name: String,
    /// Rate in percent.
    pub percentage: Decimal,
    /// Whether the tax can be picked for new invoices.
    pub is_active: bool,
}

/// Partial tax update.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaxInput {
    /// New name.
    pub name: Option<String>,
    /// New rate. Existing invoices keep their computed totals.
    pub percentage: Option<Decimal>,
    /// Active flag.
    pub is_active: Option<bool>,
}

/// Input for a vendor.
#[derive(Debug, Clone)]
pub struct VendorInput {
    /// Name.
    pub name: String,
    /// Address or city.
    pub location: String,
    /// Contact person.
    pub contact_person: Option<String>,
    /// Phone.
    pub phone: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Category of goods or services.
    pub category_id: Uuid,
}

/// Partial vendor update.
#[derive(Debug, Clone, Default)]
pub struct UpdateVendorInput {
    /// New name.
    pub name: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// Contact person.
    pub contact_person: Patch<String>,
    /// Phone.
    pub phone: Patch<String>,
    /// Email.
    pub email: Patch<String>,
    /// New category.
    pub category_id: Option<Uuid>,
}

/// Checks a tax percentage.
///
/// # Errors
///
/// Returns `CatalogError::InvalidPercentage` outside `0..=100` or beyond two decimals.
pub fn validate_percentage(percentage: Decimal) -> Result<(), CatalogError> {
    if percentage < Decimal::ZERO
        || percentage > MAX_PERCENTAGE
        || percentage.normalize().scale() > PERCENTAGE_SCALE
    {
        return Err(CatalogError::InvalidPercentage);
    }
    Ok(())
}

/// Repository for categories, taxes and vendors.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
}

impl CatalogRepository {
    /// Creates a new catalog repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    // ---------------------------------------------------------------- categories

    /// Lists categories by name, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_categories(
        &self,
        category_type: Option<CategoryType>,
    ) -> Result<Vec<categories::Model>, CatalogError> {
        let mut query = categories::Entity::find().order_by_asc(categories::Column::Name);
        if let Some(category_type) = category_type {
            query = query.filter(categories::Column::CategoryType.eq(category_type));
        }
        Ok(query.all(&self.db).await?)
    }

    /// Finds a category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` or a database error.
    pub async fn find_category(&self, id: Uuid) -> Result<categories::Model, CatalogError> {
        categories::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::CategoryNotFound(id))
    }

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_category(
        &self,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> Result<categories::Model, CatalogError> {
        let timestamp = now.into();
        let category = categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            category_type: Set(input.category_type),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// Updates a category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` or a database error.
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
        now: DateTime<Utc>,
    ) -> Result<categories::Model, CatalogError> {
        let category = self.find_category(id).await?;

        let mut active: categories::ActiveModel = category.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(category_type) = input.category_type {
            active.category_type = Set(category_type);
        }
        active.updated_at = Set(now.into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes an unused category.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound`, `InUse`, or a database error.
    pub async fn delete_category(&self, id: Uuid) -> Result<(), CatalogError> {
        let result = categories::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| in_use_or(e, "category"))?;
        if result.rows_affected == 0 {
            return Err(CatalogError::CategoryNotFound(id));
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    // --------------------------------------------------------------------- taxes

    /// Lists taxes by name; `active_only` hides deactivated ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_taxes(&self, active_only: bool) -> Result<Vec<taxes::Model>, CatalogError> {
        let mut query = taxes::Entity::find().order_by_asc(taxes::Column::Name);
        if active_only {
            query = query.filter(taxes::Column::IsActive.eq(true));
        }
        Ok(query.all(&self.db).await?)
    }

    /// Finds a tax.
    ///
    /// # Errors
    ///
    /// Returns `TaxNotFound` or a database error.
    pub async fn find_tax(&self, id: Uuid) -> Result<taxes::Model, CatalogError> {
        taxes::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::TaxNotFound(id))
    }

    /// Creates a tax.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPercentage` or a database error.
    pub async fn create_tax(
        &self,
        input: TaxInput,
        now: DateTime<Utc>,
    ) -> Result<taxes::Model, CatalogError> {
        validate_percentage(input.percentage)?;

        let timestamp = now.into();
        let tax = taxes::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            percentage: Set(input.percentage),
            is_active: Set(input.is_active),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(tax_id = %tax.id, percentage = %tax.percentage, "tax created");
        Ok(tax)
    }

    /// Updates a tax.
    ///
    /// # Errors
    ///
    /// Returns `TaxNotFound`, `InvalidPercentage`, or a database error.
    pub async fn update_tax(
        &self,
        id: Uuid,
        input: UpdateTaxInput,
        now: DateTime<Utc>,
    ) -> Result<taxes::Model, CatalogError> {
        if let Some(percentage) = input.percentage {
            validate_percentage(percentage)?;
        }
        let tax = self.find_tax(id).await?;

        let mut active: taxes::ActiveModel = tax.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(percentage) = input.percentage {
            active.percentage = Set(percentage);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(now.into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a tax; invoices that used it keep their totals and lose the link.
    ///
    /// # Errors
    ///
    /// Returns `TaxNotFound` or a database error.
    pub async fn delete_tax(&self, id: Uuid) -> Result<(), CatalogError> {
        let result = taxes::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::TaxNotFound(id));
        }
        info!(tax_id = %id, "tax deleted");
        Ok(())
    }

    // ------------------------------------------------------------------- vendors

    /// Lists vendors by name, optionally matching name or location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_vendors(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<vendors::Model>, CatalogError> {
        let page = page.normalized();
        let mut condition = Condition::all();
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition = condition.add(
                Condition::any()
                    .add(Expr::col((vendors::Entity, vendors::Column::Name)).ilike(pattern.as_str()))
                    .add(
                        Expr::col((vendors::Entity, vendors::Column::Location))
                            .ilike(pattern.as_str()),
                    ),
            );
        }

        let total = vendors::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;
        let rows = vendors::Entity::find()
            .filter(condition)
            .order_by_asc(vendors::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Finds a vendor.
    ///
    /// # Errors
    ///
    /// Returns `VendorNotFound` or a database error.
    pub async fn find_vendor(&self, id: Uuid) -> Result<vendors::Model, CatalogError> {
        vendors::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CatalogError::VendorNotFound(id))
    }

    /// Creates a vendor.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` or a database error.
    pub async fn create_vendor(
        &self,
        input: VendorInput,
        now: DateTime<Utc>,
    ) -> Result<vendors::Model, CatalogError> {
        self.find_category(input.category_id).await?;

        let timestamp = now.into();
        let vendor = vendors::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            location: Set(input.location),
            contact_person: Set(input.contact_person),
            phone: Set(input.phone),
            email: Set(input.email),
            category_id: Set(input.category_id),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await?;

        info!(vendor_id = %vendor.id, name = %vendor.name, "vendor created");
        Ok(vendor)
    }

    /// Updates a vendor.
    ///
    /// # Errors
    ///
    /// Returns `VendorNotFound`, `CategoryNotFound`, or a database error.
    pub async fn update_vendor(
        &self,
        id: Uuid,
        input: UpdateVendorInput,
        now: DateTime<Utc>,
    ) -> Result<vendors::Model, CatalogError> {
        let vendor = self.find_vendor(id).await?;
        if let Some(category_id) = input.category_id {
            self.find_category(category_id).await?;
        }

        let contact_person = input.contact_person.apply(vendor.contact_person.clone());
        let phone = input.phone.apply(vendor.phone.clone());
        let email = input.email.apply(vendor.email.clone());

        let mut active: vendors::ActiveModel = vendor.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        active.contact_person = Set(contact_person);
        active.phone = Set(phone);
        active.email = Set(email);
        active.updated_at = Set(now.into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a vendor; its invoices lose the link.
    ///
    /// # Errors
    ///
    /// Returns `VendorNotFound` or a database error.
    pub async fn delete_vendor(&self, id: Uuid) -> Result<(), CatalogError> {
        let result = vendors::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CatalogError::VendorNotFound(id));
        }
        info!(vendor_id = %id, "vendor deleted");
        Ok(())
    }
}

fn in_use_or(err: DbErr, entity: &'static str) -> CatalogError {
    if is_foreign_key_violation(&err) {
        CatalogError::InUse(entity)
    } else {
        CatalogError::Database(err)
    }
}
