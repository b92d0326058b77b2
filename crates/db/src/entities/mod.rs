//! `SeaORM` entity definitions.

pub mod categories;
pub mod document_counters;
pub mod files;
pub mod invoice_attachments;
pub mod invoices;
pub mod notifications;
pub mod project_activities;
pub mod project_documents;
pub mod project_members;
pub mod projects;
pub mod reimbursement_attachments;
pub mod reimbursements;
pub mod sea_orm_active_enums;
pub mod tasks;
pub mod taxes;
pub mod team_members;
pub mod teams;
pub mod users;
pub mod vendors;
