//! Tax and total computation.
//!
//! All arithmetic is exact `Decimal`. Tax rates are percentages (`11` means 11%).

pub mod headroom;
pub mod tax;

#[cfg(test)]
mod tax_props;

pub use headroom::{ContractUtilization, cap_to_headroom, contract_headroom};
pub use tax::{MONEY_SCALE, Totals, compute_totals};
