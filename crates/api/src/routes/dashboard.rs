//! Dashboard routes.

use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::get,
};
use serde::Deserialize;

use opsledger_core::access::Operation;
use opsledger_core::dashboard::DashboardRange;
use opsledger_db::DashboardRepository;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::response::RequestContext;

/// Creates the dashboard routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/finance", get(finance_dashboard))
        .route("/dashboard/summary", get(summary))
}

/// Query parameters for the finance dashboard.
///
/// `range` stays a plain string so unknown values fall back to the default
/// window instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct FinanceQuery {
    /// `last6months`, `ytd` or `thisyear`.
    pub range: Option<String>,
}

/// GET `/dashboard/finance?range=`
/// Totals, outstanding amounts, monthly series and recent invoices.
async fn finance_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
    Query(query): Query<FinanceQuery>,
) -> ApiResult<Response> {
    auth.authorize(Operation::FinanceDashboard)?;

    let range = DashboardRange::parse_or_default(query.range.as_deref());
    let dashboard = DashboardRepository::new((*state.db).clone())
        .finance(range, ctx.now)
        .await?;
    Ok(ctx.ok(dashboard))
}

/// GET `/dashboard/summary`
/// Headline numbers for the caller's role.
async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    ctx: RequestContext,
) -> ApiResult<Response> {
    auth.authorize(Operation::DashboardSummary)?;

    let summary = DashboardRepository::new((*state.db).clone())
        .summary(auth.principal())
        .await?;
    Ok(ctx.ok(summary))
}
