//! Project tasks.
//!
//! Tasks belong to a project and are assigned to one user. Managers move a
//! task freely through its workflow; employees may only report progress on
//! tasks assigned to them.
//!
//! # Modules
//!
//! - `types` - Status and priority
//! - `error` - Status change errors
//! - `service` - Status change guard

pub mod error;
pub mod service;
pub mod types;

pub use error::TaskError;
pub use service::TaskService;
pub use types::{TaskPriority, TaskStatus};
