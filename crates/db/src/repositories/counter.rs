//! Per-prefix, per-period document counters.
//!
//! ```text
//! txn ─► greatest issued number with stem "INC-202401-" ─► seed = seq + 1
//!     ─► INSERT .. ON CONFLICT DO UPDATE .. RETURNING last_value   (row lock)
//!     ─► insert invoice with the returned number ─► commit
//! ```
//!
//! The upsert locks the counter row until the surrounding transaction ends,
//! so concurrent creators in the same period are serialized. The seed keeps
//! the counter ahead of numbers issued before the counter row existed.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement,
};

use opsledger_core::numbering::{DocumentKind, DocumentNumber, NumberingError, Period, next_sequence};

use crate::entities::invoices;

const NEXT_VALUE_SQL: &str = r"
INSERT INTO document_counters (prefix, period, last_value, updated_at)
VALUES ($1, $2, $3, NOW())
ON CONFLICT (prefix, period) DO UPDATE
SET last_value = GREATEST(document_counters.last_value + 1, EXCLUDED.last_value),
    updated_at = NOW()
RETURNING last_value
";

/// Errors raised while issuing a number.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    /// Parsing or advancing the sequence failed.
    #[error(transparent)]
    Numbering(#[from] NumberingError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Greatest invoice number already issued under `kind` and `period`.
///
/// Longer numbers sort first so a sequence past 9999 still wins over 4-digit ones.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn latest_number<C: ConnectionTrait>(
    db: &C,
    kind: DocumentKind,
    period: Period,
) -> Result<Option<String>, DbErr> {
    invoices::Entity::find()
        .filter(invoices::Column::InvoiceNumber.starts_with(DocumentNumber::stem(kind, period)))
        .select_only()
        .column(invoices::Column::InvoiceNumber)
        .order_by_desc(Expr::cust("LENGTH(invoice_number)"))
        .order_by_desc(invoices::Column::InvoiceNumber)
        .into_tuple()
        .one(db)
        .await
}

/// Issues the next number for `kind` in `period`.
///
/// Must run inside the transaction that stores the numbered document.
///
/// # Errors
///
/// Returns an error if the latest number is malformed, the sequence is
/// exhausted, or the database query fails.
pub async fn next_number<C: ConnectionTrait>(
    txn: &C,
    kind: DocumentKind,
    period: Period,
) -> Result<DocumentNumber, CounterError> {
    let latest = latest_number(txn, kind, period).await?;
    let seed = next_sequence(latest.as_deref(), kind, period)?;
    let exhausted = || NumberingError::Exhausted(DocumentNumber::stem(kind, period));
    let seed = i32::try_from(seed).map_err(|_| exhausted())?;

    let row = txn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_VALUE_SQL,
            [kind.prefix().into(), period.key().into(), seed.into()],
        ))
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("document counter".to_string()))?;

    let value: i32 = row.try_get("", "last_value")?;
    let sequence = u32::try_from(value).map_err(|_| exhausted())?;

    Ok(DocumentNumber::new(kind, period, sequence))
}
