//! Master data routes: categories, taxes and vendors.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_db::CatalogRepository;
use opsledger_db::entities::{categories, sea_orm_active_enums::CategoryType, taxes, vendors};
use opsledger_db::repositories::{
    CategoryInput, TaxInput, UpdateCategoryInput, UpdateTaxInput, UpdateVendorInput, VendorInput,
};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, not_blank};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::views::Deleted;

/// Creates the master data routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/taxes", get(list_taxes).post(create_tax))
        .route(
            "/taxes/{id}",
            get(get_tax).patch(update_tax).delete(delete_tax),
        )
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route(
            "/vendors/{id}",
            get(get_vendor).patch(update_vendor).delete(delete_vendor),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing categories.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListCategoriesQuery {
    /// Only INCOME or EXPENSE categories.
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

/// Request body for creating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    /// Category name.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
    /// INCOME or EXPENSE.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// Request body for updating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: Option<String>,
    /// New direction.
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
}

/// Query parameters for listing taxes.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListTaxesQuery {
    /// Hide inactive taxes.
    #[serde(default)]
    pub active_only: bool,
}

/// Request body for creating a tax.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaxRequest {
    /// Tax name.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
    /// Rate in percent, 0 to 100.
    pub percentage: Decimal,
    /// Whether new invoices may use it.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Request body for updating a tax.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaxRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: Option<String>,
    /// New rate.
    pub percentage: Option<Decimal>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Query parameters for listing vendors.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListVendorsQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Matches name or location.
    pub search: Option<String>,
}

/// Request body for creating a vendor.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorRequest {
    /// Vendor name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: String,
    /// City or address.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub location: String,
    /// Contact person.
    pub contact_person: Option<String>,
    /// Phone number.
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    /// Email address.
    #[validate(email)]
    pub email: Option<String>,
    /// Default category of the vendor's invoices.
    pub category_id: Uuid,
}

/// Request body for updating a vendor; `null` clears contact fields.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVendorRequest {
    /// New name.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: Option<String>,
    /// New location.
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub location: Option<String>,
    /// Contact person.
    #[serde(default, deserialize_with = "double_option")]
    pub contact_person: Option<Option<String>>,
    /// Phone number.
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    /// Email address.
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    /// New category.
    pub category_id: Option<Uuid>,
}

impl From<UpdateVendorRequest> for UpdateVendorInput {
    fn from(req: UpdateVendorRequest) -> Self {
        Self {
            name: req.name,
            location: req.location,
            contact_person: req.contact_person.into(),
            phone: req.phone.into(),
            email: req.email.into(),
            category_id: req.category_id,
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// A category.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    /// Category ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// INCOME or EXPENSE.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<categories::Model> for CategoryResponse {
    fn from(category: categories::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
            category_type: category.category_type,
            created_at: category.created_at.with_timezone(&Utc),
        }
    }
}

/// A tax rate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResponse {
    /// Tax ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Rate in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    /// Whether new invoices may use it.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<taxes::Model> for TaxResponse {
    fn from(tax: taxes::Model) -> Self {
        Self {
            id: tax.id,
            name: tax.name,
            percentage: tax.percentage,
            is_active: tax.is_active,
            created_at: tax.created_at.with_timezone(&Utc),
        }
    }
}

/// A vendor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorResponse {
    /// Vendor ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Location.
    pub location: String,
    /// Contact person.
    pub contact_person: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Category.
    pub category_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<vendors::Model> for VendorResponse {
    fn from(vendor: vendors::Model) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name,
            location: vendor.location,
            contact_person: vendor.contact_person,
            phone: vendor.phone,
            email: vendor.email,
            category_id: vendor.category_id,
            created_at: vendor.created_at.with_timezone(&Utc),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn repo(state: &AppState) -> CatalogRepository {
    CatalogRepository::new((*state.db).clone())
}

// ============================================================================
// Category Handlers
// ============================================================================

/// GET `/categories`
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListCategoriesQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CatalogRead)?;

    let categories = repo(&state).list_categories(query.category_type).await?;
    let body: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(ctx.ok(body))
}

/// GET `/categories/{id}`
async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CatalogRead)?;
    let category = repo(&state).find_category(id).await?;
    Ok(ctx.ok(CategoryResponse::from(category)))
}

/// POST `/categories`
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CategoryWrite)?;

    let input = CategoryInput {
        name: payload.name.trim().to_string(),
        category_type: payload.category_type,
    };
    let category = repo(&state).create_category(input, ctx.now).await?;
    Ok(ctx.created(CategoryResponse::from(category)))
}

/// PATCH `/categories/{id}`
async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CategoryWrite)?;

    let input = UpdateCategoryInput {
        name: payload.name.map(|n| n.trim().to_string()),
        category_type: payload.category_type,
    };
    let category = repo(&state).update_category(id, input, ctx.now).await?;
    Ok(ctx.ok(CategoryResponse::from(category)))
}

/// DELETE `/categories/{id}`
/// Fails with 409 while invoices, claims or vendors still use it.
async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CategoryWrite)?;
    repo(&state).delete_category(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

// ============================================================================
// Tax Handlers
// ============================================================================

/// GET `/taxes`
async fn list_taxes(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListTaxesQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CatalogRead)?;

    let taxes = repo(&state).list_taxes(query.active_only).await?;
    let body: Vec<TaxResponse> = taxes.into_iter().map(TaxResponse::from).collect();
    Ok(ctx.ok(body))
}

/// GET `/taxes/{id}`
async fn get_tax(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::CatalogRead)?;
    let tax = repo(&state).find_tax(id).await?;
    Ok(ctx.ok(TaxResponse::from(tax)))
}

/// POST `/taxes`
async fn create_tax(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateTaxRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaxWrite)?;

    let input = TaxInput {
        name: payload.name.trim().to_string(),
        percentage: payload.percentage,
        is_active: payload.is_active,
    };
    let tax = repo(&state).create_tax(input, ctx.now).await?;
    Ok(ctx.created(TaxResponse::from(tax)))
}

/// PATCH `/taxes/{id}`
/// Existing invoices keep the tax amount computed when they were saved.
async fn update_tax(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTaxRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaxWrite)?;

    let input = UpdateTaxInput {
        name: payload.name.map(|n| n.trim().to_string()),
        percentage: payload.percentage,
        is_active: payload.is_active,
    };
    let tax = repo(&state).update_tax(id, input, ctx.now).await?;
    Ok(ctx.ok(TaxResponse::from(tax)))
}

/// DELETE `/taxes/{id}`
async fn delete_tax(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::TaxWrite)?;
    repo(&state).delete_tax(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

// ============================================================================
// Vendor Handlers
// ============================================================================

/// GET `/vendors`
async fn list_vendors(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListVendorsQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::VendorRead)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let result = repo(&state)
        .list_vendors(query.search.as_deref(), page)
        .await?;
    Ok(ctx.page(result.map(VendorResponse::from)))
}

/// GET `/vendors/{id}`
async fn get_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::VendorRead)?;
    let vendor = repo(&state).find_vendor(id).await?;
    Ok(ctx.ok(VendorResponse::from(vendor)))
}

/// POST `/vendors`
async fn create_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateVendorRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::VendorWrite)?;

    let input = VendorInput {
        name: payload.name.trim().to_string(),
        location: payload.location.trim().to_string(),
        contact_person: payload.contact_person,
        phone: payload.phone,
        email: payload.email,
        category_id: payload.category_id,
    };
    let vendor = repo(&state).create_vendor(input, ctx.now).await?;
    Ok(ctx.created(VendorResponse::from(vendor)))
}

/// PATCH `/vendors/{id}`
async fn update_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateVendorRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::VendorWrite)?;
    let vendor = repo(&state).update_vendor(id, payload.into(), ctx.now).await?;
    Ok(ctx.ok(VendorResponse::from(vendor)))
}

/// DELETE `/vendors/{id}`
/// Invoices of the vendor keep their rows with the vendor link cleared.
async fn delete_vendor(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::VendorDelete)?;
    repo(&state).delete_vendor(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use opsledger_core::invoice::Patch;

    use crate::routes::test_support::{json, request, send};

    #[test]
    fn test_update_vendor_clears_contact() {
        let req: UpdateVendorRequest =
            serde_json::from_str(r#"{"phone": null, "email": "ap@vendor.test"}"#).unwrap();
        let input = UpdateVendorInput::from(req);

        assert_eq!(input.phone, Patch::Clear);
        assert_eq!(input.email, Patch::Set("ap@vendor.test".to_string()));
        assert_eq!(input.contact_person, Patch::Keep);
    }

    #[test]
    fn test_new_tax_defaults_to_active() {
        let req: CreateTaxRequest =
            serde_json::from_str(r#"{"name": "VAT", "percentage": 11}"#).unwrap();
        assert!(req.is_active);
    }

    #[tokio::test]
    async fn test_finance_cannot_write_categories() {
        let body = r#"{"name": "Consulting", "type": "INCOME"}"#;
        let response = send(request("POST", "/api/categories", Some(Role::Finance), Some(body))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_employee_cannot_read_vendors() {
        let response = send(request("GET", "/api/vendors", Some(Role::Employees), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_finance_cannot_delete_vendors() {
        let uri = format!("/api/vendors/{}", Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Finance), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_vendor_email() {
        let body = format!(
            r#"{{"name": "Acme", "location": "Jakarta", "email": "nope", "categoryId": "{}"}}"#,
            Uuid::new_v4()
        );
        let response = send(request("POST", "/api/vendors", Some(Role::Finance), Some(&body))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["errors"][0]["field"], "email");
    }
}
