//! Role-based access control.
//!
//! Two questions are answered here without touching the store:
//! may this principal perform an operation at all (`authorize`), and which
//! rows of a resource may it see (`scope`). The database layer turns a
//! `Scope` into a query condition.

pub mod error;
pub mod policy;
pub mod role;
pub mod scope;

pub use error::AccessError;
pub use policy::{Operation, allowed_roles, authorize};
pub use role::{Principal, Role};
pub use scope::{Resource, Scope, scope};
