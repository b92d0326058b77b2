//! Invoice domain types and status changes.
//!
//! Invoices move freely between UNPAID and DEBT. Any move to PAID stamps the
//! payment time and any move away from PAID clears it, so `paid_at` is set
//! exactly when the status is PAID.

pub mod service;
pub mod types;

pub use service::{InvoiceService, StatusChange};
pub use types::{InvoiceStatus, InvoiceType, Patch};
