//! Invoice routes.

use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Response,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use opsledger_core::access::Operation;
use opsledger_core::invoice::{InvoiceStatus, InvoiceType};
use opsledger_db::InvoiceRepository;
use opsledger_db::entities::{
    invoices,
    sea_orm_active_enums::{self, CategoryType},
    taxes, vendors,
};
use opsledger_db::repositories::{
    CreateInvoiceInput, InvoiceDetail, InvoiceFilter, UpdateInvoiceInput,
};
use opsledger_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::{ValidatedJson, ValidatedQuery, double_option, positive_amount};
use crate::middleware::AuthUser;
use crate::response::RequestContext;
use crate::routes::files::{FileResponse, discard_upload, require_storage, store_upload};
use crate::routes::views::{Deleted, NamedRef, UserRef};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{id}",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/status", patch(update_status))
        .route("/invoices/{id}/attachments", post(add_attachment))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing invoices.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u64>,
    /// Only invoices of this project.
    pub project_id: Option<Uuid>,
    /// Only this direction.
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    /// Only this status.
    pub status: Option<InvoiceStatus>,
    /// Matches number or notes.
    pub search: Option<String>,
}

/// Request body for creating an invoice.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// INCOME or EXPENSE.
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Linked vendor.
    pub vendor_id: Option<Uuid>,
    /// Category.
    pub category_id: Uuid,
    /// Tax rate to apply.
    pub tax_id: Option<Uuid>,
    /// Base amount before tax.
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    /// Initial status; UNPAID when absent.
    pub status: Option<InvoiceStatus>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Free text.
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Request body for a partial invoice update.
///
/// Nullable links accept `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    /// New direction.
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    /// Project link.
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<Uuid>>,
    /// Vendor link.
    #[serde(default, deserialize_with = "double_option")]
    pub vendor_id: Option<Option<Uuid>>,
    /// New category.
    pub category_id: Option<Uuid>,
    /// Tax link.
    #[serde(default, deserialize_with = "double_option")]
    pub tax_id: Option<Option<Uuid>>,
    /// New base amount.
    #[validate(custom(function = "positive_amount"))]
    pub amount: Option<Decimal>,
    /// New status.
    pub status: Option<InvoiceStatus>,
    /// Due date.
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    /// Notes.
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Request body for a status change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    /// PAID, UNPAID or DEBT.
    pub status: InvoiceStatus,
}

impl From<CreateInvoiceRequest> for CreateInvoiceInput {
    fn from(req: CreateInvoiceRequest) -> Self {
        Self {
            invoice_type: req.invoice_type,
            project_id: req.project_id,
            vendor_id: req.vendor_id,
            category_id: req.category_id,
            tax_id: req.tax_id,
            amount: req.amount,
            status: req.status,
            due_date: req.due_date,
            notes: req.notes,
        }
    }
}

impl From<UpdateInvoiceRequest> for UpdateInvoiceInput {
    fn from(req: UpdateInvoiceRequest) -> Self {
        Self {
            invoice_type: req.invoice_type,
            project_id: req.project_id.into(),
            vendor_id: req.vendor_id.into(),
            category_id: req.category_id,
            tax_id: req.tax_id.into(),
            amount: req.amount,
            status: req.status,
            due_date: req.due_date.into(),
            notes: req.notes.into(),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Invoice as returned by list, create and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    /// Invoice ID.
    pub id: Uuid,
    /// Document number.
    pub invoice_number: String,
    /// Direction.
    #[serde(rename = "type")]
    pub invoice_type: sea_orm_active_enums::InvoiceType,
    /// Payment status.
    pub status: sea_orm_active_enums::InvoiceStatus,
    /// Base amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Tax on the amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    /// Amount plus tax.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Linked project.
    pub project_id: Option<Uuid>,
    /// Linked vendor.
    pub vendor_id: Option<Uuid>,
    /// Category.
    pub category_id: Uuid,
    /// Applied tax.
    pub tax_id: Option<Uuid>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Set while PAID.
    pub paid_at: Option<DateTime<Utc>>,
    /// Free text.
    pub notes: Option<String>,
    /// Creator.
    pub created_by_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<invoices::Model> for InvoiceResponse {
    fn from(invoice: invoices::Model) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            invoice_type: invoice.invoice_type,
            status: invoice.status,
            amount: invoice.amount,
            tax_amount: invoice.tax_amount,
            total_amount: invoice.total_amount,
            project_id: invoice.project_id,
            vendor_id: invoice.vendor_id,
            category_id: invoice.category_id,
            tax_id: invoice.tax_id,
            due_date: invoice.due_date.map(|d| d.with_timezone(&Utc)),
            paid_at: invoice.paid_at.map(|d| d.with_timezone(&Utc)),
            notes: invoice.notes,
            created_by_id: invoice.created_by_id,
            created_at: invoice.created_at.with_timezone(&Utc),
            updated_at: invoice.updated_at.with_timezone(&Utc),
        }
    }
}

/// Vendor reference inside an invoice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRef {
    /// Vendor ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Location.
    pub location: String,
}

impl From<vendors::Model> for VendorRef {
    fn from(vendor: vendors::Model) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name,
            location: vendor.location,
        }
    }
}

/// Category reference with its direction.
#[derive(Debug, Serialize)]
pub struct CategoryRef {
    /// Category ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// INCOME or EXPENSE.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// Tax reference with its rate.
#[derive(Debug, Serialize)]
pub struct TaxRef {
    /// Tax ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Rate in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
}

impl From<taxes::Model> for TaxRef {
    fn from(tax: taxes::Model) -> Self {
        Self {
            id: tax.id,
            name: tax.name,
            percentage: tax.percentage,
        }
    }
}

/// Invoice with its related records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailResponse {
    /// The invoice.
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    /// Linked project.
    pub project: Option<NamedRef>,
    /// Linked vendor.
    pub vendor: Option<VendorRef>,
    /// Category.
    pub category: Option<CategoryRef>,
    /// Applied tax.
    pub tax: Option<TaxRef>,
    /// Creator.
    pub created_by: Option<UserRef>,
    /// Attached files.
    pub attachments: Vec<FileResponse>,
}

impl From<InvoiceDetail> for InvoiceDetailResponse {
    fn from(detail: InvoiceDetail) -> Self {
        Self {
            invoice: detail.invoice.into(),
            project: detail.project.map(NamedRef::from),
            vendor: detail.vendor.map(VendorRef::from),
            category: detail.category.map(|c| CategoryRef {
                id: c.id,
                name: c.name,
                category_type: c.category_type,
            }),
            tax: detail.tax.map(TaxRef::from),
            created_by: detail.created_by.map(UserRef::from),
            attachments: detail.attachments.into_iter().map(FileResponse::from).collect(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/invoices`
/// Invoices visible to the caller, newest first.
async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedQuery(query): ValidatedQuery<ListInvoicesQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceList)?;

    let page = PageRequest::new(query.page.unwrap_or(1), query.size.unwrap_or(10));
    let filter = InvoiceFilter {
        project_id: query.project_id,
        invoice_type: query.invoice_type,
        status: query.status,
        search: query.search,
    };

    let result = InvoiceRepository::new((*state.db).clone())
        .list(auth.principal(), filter, page)
        .await?;
    Ok(ctx.page(result.map(InvoiceResponse::from)))
}

/// POST `/invoices`
/// Numbers the invoice and computes its totals.
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateInvoiceRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceCreate)?;

    let invoice = InvoiceRepository::new((*state.db).clone())
        .create(auth.user_id(), payload.into(), ctx.now)
        .await?;
    Ok(ctx.created(InvoiceResponse::from(invoice)))
}

/// GET `/invoices/{id}`
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceView)?;

    let detail = InvoiceRepository::new((*state.db).clone())
        .find_one(auth.principal(), id)
        .await?;
    Ok(ctx.ok(InvoiceDetailResponse::from(detail)))
}

/// PATCH `/invoices/{id}`
/// Omitted fields keep their stored values; totals are recomputed.
async fn update_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateInvoiceRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceUpdate)?;

    let invoice = InvoiceRepository::new((*state.db).clone())
        .update(id, payload.into(), ctx.now)
        .await?;
    Ok(ctx.ok(InvoiceResponse::from(invoice)))
}

/// PATCH `/invoices/{id}/status`
async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceUpdateStatus)?;

    let invoice = InvoiceRepository::new((*state.db).clone())
        .update_status(id, payload.status, ctx.now)
        .await?;
    Ok(ctx.ok(InvoiceResponse::from(invoice)))
}

/// DELETE `/invoices/{id}`
async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceDelete)?;

    InvoiceRepository::new((*state.db).clone()).delete(id).await?;
    Ok(ctx.ok(Deleted { id }))
}

/// POST `/invoices/{id}/attachments`
/// Multipart upload with a `file` part.
async fn add_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Response> {
    auth.authorize(Operation::InvoiceAttach)?;
    let storage = require_storage(&state)?;

    let file = store_upload(&state, &storage, auth.user_id(), multipart, ctx.now).await?;
    if let Err(e) = InvoiceRepository::new((*state.db).clone())
        .add_attachment(id, file.id, ctx.now)
        .await
    {
        discard_upload(&state, &storage, &file).await;
        return Err(e.into());
    }
    Ok(ctx.created(FileResponse::from(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use opsledger_core::access::Role;
    use opsledger_core::invoice::Patch;
    use rust_decimal_macros::dec;

    use crate::routes::test_support::{json, request, send};

    #[test]
    fn test_update_request_maps_null_to_clear() {
        let req: UpdateInvoiceRequest =
            serde_json::from_str(r#"{"taxId": null, "amount": 250}"#).unwrap();
        let input = UpdateInvoiceInput::from(req);

        assert_eq!(input.tax_id, Patch::Clear);
        assert_eq!(input.project_id, Patch::Keep);
        assert_eq!(input.amount, Some(dec!(250)));
    }

    #[test]
    fn test_create_request_uses_type_key() {
        let req: CreateInvoiceRequest = serde_json::from_str(
            r#"{"type": "EXPENSE", "categoryId": "6f1c1f4e-3b8e-4c0e-9a51-0f7c8b8d2a10", "amount": 1000000}"#,
        )
        .unwrap();
        assert_eq!(req.invoice_type, InvoiceType::Expense);
        assert!(req.validate().is_ok());
    }

    #[tokio::test]
    async fn test_employee_cannot_list_invoices() {
        let response = send(request("GET", "/api/invoices", Some(Role::Employees), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(response).await["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_before_store() {
        let body = r#"{"type": "INCOME", "categoryId": "6f1c1f4e-3b8e-4c0e-9a51-0f7c8b8d2a10", "amount": 0}"#;
        let response = send(request("POST", "/api/invoices", Some(Role::Finance), Some(body))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["errors"][0]["field"], "amount");
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let uri = format!("/api/invoices/{}/status", Uuid::new_v4());
        let response = send(request(
            "PATCH",
            &uri,
            Some(Role::Finance),
            Some(r#"{"status": "CANCELLED"}"#),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_only_admin_deletes() {
        let uri = format!("/api/invoices/{}", Uuid::new_v4());
        let response = send(request("DELETE", &uri, Some(Role::Finance), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_attachment_without_storage_is_unavailable() {
        let uri = format!("/api/invoices/{}/attachments", Uuid::new_v4());
        let mut req = request("POST", &uri, Some(Role::Finance), None);
        req.headers_mut().insert(
            "content-type",
            "multipart/form-data; boundary=X-BOUNDARY".parse().unwrap(),
        );

        let response = send(req).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
