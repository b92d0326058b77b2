//! Contract value ceiling for income invoiced against a project.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::tax::{MONEY_SCALE, compute_totals};

/// Remaining contract value after `invoiced_total`, never negative.
#[must_use]
pub fn contract_headroom(contract_value: Decimal, invoiced_total: Decimal) -> Decimal {
    (contract_value - invoiced_total).max(Decimal::ZERO)
}

/// Caps a base amount so that its tax-inclusive total fits in `headroom`.
///
/// Returns `None` when there is no headroom left. The capped amount is rounded
/// down to `MONEY_SCALE` places, so `amount + tax <= headroom` holds.
#[must_use]
pub fn cap_to_headroom(
    amount: Decimal,
    tax_rate_percent: Option<Decimal>,
    headroom: Decimal,
) -> Option<Decimal> {
    if headroom <= Decimal::ZERO || amount <= Decimal::ZERO {
        return None;
    }

    if compute_totals(amount, tax_rate_percent).total_amount <= headroom {
        return Some(amount);
    }

    let multiplier = Decimal::ONE + tax_rate_percent.unwrap_or(Decimal::ZERO) / Decimal::ONE_HUNDRED;
    let mut capped =
        (headroom / multiplier).round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero);

    // Tax rounding can push the total one unit over; step down until it fits.
    let step = Decimal::new(1, MONEY_SCALE);
    while capped > Decimal::ZERO && compute_totals(capped, tax_rate_percent).total_amount > headroom
    {
        capped -= step;
    }

    (capped > Decimal::ZERO).then_some(capped)
}

/// Invoiced income compared with a project's contract value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractUtilization {
    /// Contract ceiling.
    #[serde(with = "rust_decimal::serde::float")]
    pub contract_value: Decimal,
    /// Sum of INCOME invoice totals on the project.
    #[serde(with = "rust_decimal::serde::float")]
    pub invoiced_total: Decimal,
    /// What may still be invoiced.
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining: Decimal,
}

impl ContractUtilization {
    /// Builds utilization figures from the contract value and invoiced total.
    #[must_use]
    pub fn new(contract_value: Decimal, invoiced_total: Decimal) -> Self {
        Self {
            contract_value,
            invoiced_total,
            remaining: contract_headroom(contract_value, invoiced_total),
        }
    }

    /// Whether invoiced income already exceeds the contract value.
    #[must_use]
    pub fn is_over_contract(&self) -> bool {
        self.invoiced_total > self.contract_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_headroom() {
        assert_eq!(contract_headroom(dec!(1000), dec!(400)), dec!(600));
        assert_eq!(contract_headroom(dec!(1000), dec!(1200)), Decimal::ZERO);
    }

    #[test]
    fn test_cap_keeps_amount_that_fits() {
        assert_eq!(
            cap_to_headroom(dec!(100), Some(dec!(11)), dec!(1000)),
            Some(dec!(100))
        );
    }

    #[test]
    fn test_cap_reduces_amount_to_fit() {
        let capped = cap_to_headroom(dec!(1000), Some(dec!(11)), dec!(555)).unwrap();
        assert_eq!(capped, dec!(500));
        assert!(compute_totals(capped, Some(dec!(11))).total_amount <= dec!(555));
    }

    #[test]
    fn test_cap_without_tax() {
        assert_eq!(cap_to_headroom(dec!(1000), None, dec!(250)), Some(dec!(250)));
    }

    #[test]
    fn test_cap_with_no_headroom() {
        assert_eq!(cap_to_headroom(dec!(1000), Some(dec!(11)), Decimal::ZERO), None);
    }

    #[test]
    fn test_cap_with_tiny_headroom() {
        assert_eq!(
            cap_to_headroom(dec!(1000), Some(dec!(11)), dec!(0.0001)),
            None
        );
    }

    #[test]
    fn test_utilization() {
        let utilization = ContractUtilization::new(dec!(5000), dec!(1500));
        assert_eq!(utilization.remaining, dec!(3500));
        assert!(!utilization.is_over_contract());

        let over = ContractUtilization::new(dec!(5000), dec!(5500));
        assert_eq!(over.remaining, Decimal::ZERO);
        assert!(over.is_over_contract());
    }
}
