//! Invoice domain types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numbering::DocumentKind;

/// Direction of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceType {
    /// Money coming in from a client.
    Income,
    /// Money going out to a vendor.
    Expense,
}

impl InvoiceType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses a type from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INCOME" => Some(Self::Income),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Document kind used when numbering invoices of this type.
    #[must_use]
    pub const fn document_kind(self) -> DocumentKind {
        match self {
            Self::Income => DocumentKind::Income,
            Self::Expense => DocumentKind::Expense,
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    /// Not yet paid.
    #[default]
    Unpaid,
    /// Settled.
    Paid,
    /// Overdue and treated as a receivable/payable debt.
    Debt,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Paid => "PAID",
            Self::Debt => "DEBT",
        }
    }

    /// Parses a status from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Some(Self::Unpaid),
            "PAID" => Some(Self::Paid),
            "DEBT" => Some(Self::Debt),
            _ => None,
        }
    }

    /// Whether the invoice still counts as outstanding.
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        matches!(self, Self::Unpaid | Self::Debt)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change to an optional field in a partial update.
///
/// JSON bodies distinguish a missing key (`Keep`) from an explicit `null`
/// (`Clear`); they arrive as `Option<Option<T>>` and convert with `From`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Leave the persisted value untouched.
    #[default]
    Keep,
    /// Remove the value.
    Clear,
    /// Replace the value.
    Set(T),
}

impl<T> Patch<T> {
    /// Applies the patch to the current value.
    #[must_use]
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Keep => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }

    /// Whether the patch leaves the value untouched.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(value: Option<Option<T>>) -> Self {
        match value {
            None => Self::Keep,
            Some(None) => Self::Clear,
            Some(Some(value)) => Self::Set(value),
        }
    }
}
