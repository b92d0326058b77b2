//! Numbering error types.

use opsledger_shared::AppError;
use thiserror::Error;

/// Errors raised while parsing or advancing document numbers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberingError {
    /// The string does not have the `{PREFIX}-{YYYYMM}-{seq}` shape.
    #[error("malformed document number: {0}")]
    Malformed(String),

    /// Year or month out of range.
    #[error("invalid period {year}-{month:02}")]
    InvalidPeriod {
        /// Calendar year.
        year: i32,
        /// Calendar month (1-12).
        month: u32,
    },

    /// The sequence cannot be advanced any further.
    #[error("sequence exhausted for {0}")]
    Exhausted(String),
}

impl From<NumberingError> for AppError {
    fn from(err: NumberingError) -> Self {
        Self::Internal(err.to_string())
    }
}
