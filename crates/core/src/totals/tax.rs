//! Tax amount and total amount for a base amount.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept for stored money values.
pub const MONEY_SCALE: u32 = 4;

/// Derived monetary fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Tax on the base amount.
    pub tax_amount: Decimal,
    /// Base amount plus tax.
    pub total_amount: Decimal,
}

/// Computes tax and total for `amount` at `tax_rate_percent`.
///
/// Without a rate the tax is zero and the total equals the amount. The tax is
/// rounded half away from zero to `MONEY_SCALE` places, and the total is
/// always exactly `amount + tax_amount`.
#[must_use]
pub fn compute_totals(amount: Decimal, tax_rate_percent: Option<Decimal>) -> Totals {
    let tax_amount = tax_rate_percent.map_or(Decimal::ZERO, |rate| {
        (amount * rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
    });

    Totals {
        tax_amount,
        total_amount: amount + tax_amount,
    }
}
