//! Document number format and sequencing.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::error::NumberingError;

/// Minimum number of digits in the sequence part.
pub const SEQUENCE_WIDTH: usize = 4;

/// Kind of document, which selects the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentKind {
    /// Income invoice (`INC`).
    Income,
    /// Expense invoice (`EXP`).
    Expense,
}

impl DocumentKind {
    /// Returns the number prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Income => "INC",
            Self::Expense => "EXP",
        }
    }

    /// Looks up the kind for a prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "INC" => Some(Self::Income),
            "EXP" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A calendar year-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Creates a period.
    ///
    /// # Errors
    ///
    /// Returns `NumberingError::InvalidPeriod` unless `1 <= month <= 12` and
    /// the year has four digits.
    pub fn new(year: i32, month: u32) -> Result<Self, NumberingError> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(NumberingError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// The period containing `at`.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Calendar month (1-12).
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// `YYYYMM` form used inside document numbers and counter rows.
    #[must_use]
    pub fn key(self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    fn parse_key(key: &str) -> Result<Self, NumberingError> {
        if key.len() != 6 || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NumberingError::Malformed(key.to_string()));
        }
        let year = key[..4]
            .parse()
            .map_err(|_| NumberingError::Malformed(key.to_string()))?;
        let month = key[4..]
            .parse()
            .map_err(|_| NumberingError::Malformed(key.to_string()))?;
        Self::new(year, month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A parsed `{PREFIX}-{YYYYMM}-{seq}` number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    /// Document kind (prefix).
    pub kind: DocumentKind,
    /// Period the number was issued in.
    pub period: Period,
    /// Sequence within the period, starting at 1.
    pub sequence: u32,
}

impl DocumentNumber {
    /// Builds a number.
    #[must_use]
    pub const fn new(kind: DocumentKind, period: Period, sequence: u32) -> Self {
        Self {
            kind,
            period,
            sequence,
        }
    }

    /// The `{PREFIX}-{YYYYMM}-` stem shared by every number of a kind and period.
    ///
    /// Used as a `LIKE` prefix when looking up the latest issued number.
    #[must_use]
    pub fn stem(kind: DocumentKind, period: Period) -> String {
        format!("{}-{}-", kind.prefix(), period.key())
    }

    /// Parses a number, accepting sequences of any width.
    ///
    /// # Errors
    ///
    /// Returns `NumberingError::Malformed` if the shape or prefix is wrong.
    pub fn parse(s: &str) -> Result<Self, NumberingError> {
        let malformed = || NumberingError::Malformed(s.to_string());

        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(period), Some(sequence)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let kind = DocumentKind::from_prefix(prefix).ok_or_else(malformed)?;
        let period = Period::parse_key(period).map_err(|_| malformed())?;
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let sequence = sequence.parse().map_err(|_| malformed())?;

        Ok(Self::new(kind, period, sequence))
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            Self::stem(self.kind, self.period),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

/// Computes the sequence that follows `latest` for the given kind and period.
///
/// `latest` is the greatest number already issued with the same stem, if any.
/// A missing number, or one from another kind or period, restarts at 1.
///
/// # Errors
///
/// Returns `NumberingError::Malformed` if `latest` cannot be parsed and
/// `NumberingError::Exhausted` if the sequence would overflow.
pub fn next_sequence(
    latest: Option<&str>,
    kind: DocumentKind,
    period: Period,
) -> Result<u32, NumberingError> {
    let Some(latest) = latest else {
        return Ok(1);
    };

    let parsed = DocumentNumber::parse(latest)?;
    if parsed.kind != kind || parsed.period != period {
        return Ok(1);
    }

    parsed
        .sequence
        .checked_add(1)
        .ok_or_else(|| NumberingError::Exhausted(DocumentNumber::stem(kind, period)))
}
