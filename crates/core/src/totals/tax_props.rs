//! Property-based tests for totals and headroom.

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::totals::headroom::{cap_to_headroom, contract_headroom};
use crate::totals::tax::{MONEY_SCALE, compute_totals};

/// Money values with two decimal places up to one billion.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Percentages 0.00..=100.00.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|basis| Decimal::new(basis, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// total == amount + tax, always.
    #[test]
    fn prop_total_is_amount_plus_tax(amount in arb_amount(), rate in proptest::option::of(arb_rate())) {
        let totals = compute_totals(amount, rate);
        prop_assert_eq!(totals.total_amount, amount + totals.tax_amount);
    }

    /// Two-decimal amounts at whole-number rates need no rounding at four places.
    #[test]
    fn prop_tax_is_exact_for_cent_amounts(amount in arb_amount(), rate in 0i64..=100) {
        let rate = Decimal::from(rate);
        let totals = compute_totals(amount, Some(rate));
        prop_assert_eq!(totals.tax_amount, amount * rate / Decimal::ONE_HUNDRED);
    }

    /// Without a rate there is no tax.
    #[test]
    fn prop_no_rate_means_no_tax(amount in arb_amount()) {
        let totals = compute_totals(amount, None);
        prop_assert_eq!(totals.tax_amount, Decimal::ZERO);
        prop_assert_eq!(totals.total_amount, amount);
    }

    /// Tax never has more than MONEY_SCALE decimal places.
    #[test]
    fn prop_tax_scale_bounded(amount in arb_amount(), rate in arb_rate()) {
        prop_assert!(compute_totals(amount, Some(rate)).tax_amount.scale() <= MONEY_SCALE);
    }

    /// A capped amount always fits inside the headroom.
    #[test]
    fn prop_capped_amount_fits(
        amount in arb_amount(),
        rate in proptest::option::of(arb_rate()),
        contract in arb_amount(),
        invoiced in arb_amount(),
    ) {
        let headroom = contract_headroom(contract, invoiced);
        if let Some(capped) = cap_to_headroom(amount, rate, headroom) {
            prop_assert!(capped <= amount);
            prop_assert!(capped > Decimal::ZERO);
            prop_assert!(compute_totals(capped, rate).total_amount <= headroom);
        }
    }

    /// Headroom is never negative.
    #[test]
    fn prop_headroom_non_negative(contract in arb_amount(), invoiced in arb_amount()) {
        prop_assert!(contract_headroom(contract, invoiced) >= Decimal::ZERO);
    }
}
