//! Core ledger logic for Opsledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Repositories in `opsledger-db` call into it for every rule that does not need
//! the store.
//!
//! # Modules
//!
//! - `numbering` - Document number format, parsing and sequencing
//! - `totals` - Tax and total computation, contract headroom
//! - `invoice` - Invoice types and status changes
//! - `reimbursement` - Reimbursement state machine
//! - `task` - Task workflow and who may move it
//! - `calendar` - Project timelines and task deadlines as events
//! - `access` - Roles, operation policy and visibility scopes
//! - `dashboard` - Reporting ranges and aggregation
//! - `notification` - Notices sent to users after transitions
//! - `storage` - Object storage for uploaded files

pub mod access;
pub mod calendar;
pub mod dashboard;
pub mod invoice;
pub mod notification;
pub mod numbering;
pub mod reimbursement;
pub mod storage;
pub mod task;
pub mod totals;
