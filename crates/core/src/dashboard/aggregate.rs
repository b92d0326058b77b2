//! Grouping and summing for dashboard figures.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::invoice::InvoiceStatus;
use crate::reimbursement::ReimbursementStatus;

/// One month of a monthly series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM` in UTC.
    pub month: String,
    /// Sum for the month.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Groups `(created_at, amount)` rows by UTC month and sums them.
///
/// Points come back in ascending month order. Months without rows are left
/// out rather than filled with zero.
pub fn monthly_series<I>(rows: I) -> Vec<MonthlyPoint>
where
    I: IntoIterator<Item = (DateTime<Utc>, Decimal)>,
{
    let mut months: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for (created_at, amount) in rows {
        *months
            .entry((created_at.year(), created_at.month()))
            .or_default() += amount;
    }

    months
        .into_iter()
        .map(|((year, month), amount)| MonthlyPoint {
            month: format!("{year:04}-{month:02}"),
            amount,
        })
        .collect()
}

/// Spend attributed to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAmount {
    /// Category name.
    pub name: String,
    /// Combined paid expense invoices and paid reimbursements.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Merges per-category sums from paid expense invoices and paid reimbursements.
///
/// Categories missing from `names` are dropped. The result is sorted by
/// amount, largest first, with ties broken by name.
pub fn merge_category_totals<A, B>(
    invoice_totals: A,
    reimbursement_totals: B,
    names: &HashMap<Uuid, String>,
) -> Vec<CategoryAmount>
where
    A: IntoIterator<Item = (Uuid, Decimal)>,
    B: IntoIterator<Item = (Uuid, Decimal)>,
{
    let mut merged: HashMap<Uuid, Decimal> = HashMap::new();
    for (category_id, amount) in invoice_totals.into_iter().chain(reimbursement_totals) {
        *merged.entry(category_id).or_default() += amount;
    }

    let mut result: Vec<CategoryAmount> = merged
        .into_iter()
        .filter_map(|(id, amount)| {
            names.get(&id).map(|name| CategoryAmount {
                name: name.clone(),
                amount,
            })
        })
        .collect();

    result.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Count and sum of reimbursements in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotal {
    /// Status.
    pub status: ReimbursementStatus,
    /// Number of claims.
    pub count: u64,
    /// Sum of claim amounts.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Merges `(status, count, total)` groups, as returned by a `GROUP BY status`
/// query, into one entry per status.
///
/// Only statuses that occur are returned, in lifecycle order.
pub fn status_rollup<I>(groups: I) -> Vec<StatusTotal>
where
    I: IntoIterator<Item = (ReimbursementStatus, u64, Decimal)>,
{
    let mut merged: HashMap<ReimbursementStatus, (u64, Decimal)> = HashMap::new();
    for (status, count, total) in groups {
        let entry = merged.entry(status).or_insert((0, Decimal::ZERO));
        entry.0 += count;
        entry.1 += total;
    }

    ReimbursementStatus::ALL
        .into_iter()
        .filter_map(|status| {
            merged.remove(&status).map(|(count, total)| StatusTotal {
                status,
                count,
                total,
            })
        })
        .collect()
}

/// Outstanding and overdue invoice figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutstandingSummary {
    /// Invoices in UNPAID or DEBT.
    pub count: u64,
    /// Sum of their totals.
    pub amount: Decimal,
    /// Outstanding invoices whose due date is strictly before now.
    pub overdue: u64,
}

/// Summarizes `(status, count, total)` invoice groups.
///
/// Groups in a settled status are ignored. `overdue` is counted by the
/// caller, since it depends on each row's due date.
pub fn outstanding<I>(groups: I, overdue: u64) -> OutstandingSummary
where
    I: IntoIterator<Item = (InvoiceStatus, u64, Decimal)>,
{
    groups
        .into_iter()
        .filter(|(status, _, _)| status.is_outstanding())
        .fold(
            OutstandingSummary {
                overdue,
                ..OutstandingSummary::default()
            },
            |mut acc, (_, count, total)| {
                acc.count += count;
                acc.amount += total;
                acc
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_monthly_series_two_months() {
        let rows = vec![
            (at(2024, 3, 2), dec!(40)),
            (at(2024, 1, 5), dec!(100)),
            (at(2024, 3, 20), dec!(210)),
        ];

        let series = monthly_series(rows);

        assert_eq!(
            series,
            vec![
                MonthlyPoint {
                    month: "2024-01".to_string(),
                    amount: dec!(100)
                },
                MonthlyPoint {
                    month: "2024-03".to_string(),
                    amount: dec!(250)
                },
            ]
        );
    }

    #[test]
    fn test_monthly_series_omits_empty_months() {
        let series = monthly_series(vec![(at(2024, 1, 1), dec!(1)), (at(2024, 4, 1), dec!(1))]);
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|p| p.month != "2024-02"));
    }

    #[test]
    fn test_monthly_series_orders_across_years() {
        let series = monthly_series(vec![(at(2025, 1, 1), dec!(1)), (at(2024, 12, 1), dec!(1))]);
        assert_eq!(series[0].month, "2024-12");
        assert_eq!(series[1].month, "2025-01");
    }

    #[test]
    fn test_monthly_series_empty() {
        assert!(monthly_series(Vec::new()).is_empty());
    }

    #[test]
    fn test_merge_category_totals() {
        let travel = Uuid::new_v4();
        let meals = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let names = HashMap::from([
            (travel, "Travel".to_string()),
            (meals, "Meals".to_string()),
        ]);

        let merged = merge_category_totals(
            vec![(travel, dec!(100)), (meals, dec!(300))],
            vec![(travel, dec!(250)), (unknown, dec!(999))],
            &names,
        );

        assert_eq!(
            merged,
            vec![
                CategoryAmount {
                    name: "Travel".to_string(),
                    amount: dec!(350)
                },
                CategoryAmount {
                    name: "Meals".to_string(),
                    amount: dec!(300)
                },
            ]
        );
    }

    #[test]
    fn test_status_rollup() {
        let groups = vec![
            (ReimbursementStatus::Paid, 1, dec!(10)),
            (ReimbursementStatus::Pending, 2, dec!(12.5)),
        ];

        let rollup = status_rollup(groups);

        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].status, ReimbursementStatus::Pending);
        assert_eq!(rollup[0].count, 2);
        assert_eq!(rollup[0].total, dec!(12.5));
        assert_eq!(rollup[1].status, ReimbursementStatus::Paid);
        assert_eq!(rollup[1].count, 1);
    }

    #[test]
    fn test_status_rollup_merges_repeated_status() {
        let rollup = status_rollup(vec![
            (ReimbursementStatus::Approved, 1, dec!(4)),
            (ReimbursementStatus::Approved, 3, dec!(6)),
        ]);
        assert_eq!(
            rollup,
            vec![StatusTotal {
                status: ReimbursementStatus::Approved,
                count: 4,
                total: dec!(10)
            }]
        );
    }

    #[test]
    fn test_outstanding() {
        let groups = vec![
            (InvoiceStatus::Unpaid, 2, dec!(125)),
            (InvoiceStatus::Debt, 1, dec!(50)),
            (InvoiceStatus::Paid, 7, dec!(1000)),
        ];

        let summary = outstanding(groups, 1);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.amount, dec!(175));
        assert_eq!(summary.overdue, 1);
    }

    #[test]
    fn test_outstanding_without_rows() {
        assert_eq!(outstanding(Vec::new(), 0), OutstandingSummary::default());
    }

    #[test]
    fn test_point_serializes_amount_as_number() {
        let point = MonthlyPoint {
            month: "2024-01".to_string(),
            amount: dec!(100.5),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert!(json["amount"].is_number());
    }
}
