//! Human-readable document numbers.
//!
//! Numbers look like `INC-202401-0007`: a prefix chosen by document kind, the
//! `YYYYMM` period, and a zero-padded sequence that restarts every period.
//! The pure functions here format, parse and advance numbers; the database
//! layer owns the counter row that makes allocation safe under concurrency.

pub mod document;
pub mod error;

#[cfg(test)]
mod document_props;

pub use document::{DocumentKind, DocumentNumber, Period, SEQUENCE_WIDTH, next_sequence};
pub use error::NumberingError;
