//! Reimbursement lifecycle.
//!
//! Claims start PENDING. From there they are approved or rejected; approved
//! claims are later paid. REJECTED and PAID are terminal. The service only
//! decides; repositories apply the returned action inside the transaction
//! that holds the row lock.
//!
//! # Modules
//!
//! - `types` - Status and action types
//! - `error` - Transition errors
//! - `service` - Transition guard

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::TransitionError;
pub use service::ReimbursementService;
pub use types::{ReimbursementAction, ReimbursementStatus};
