//! Response views shared by several route modules.

use serde::Serialize;
use uuid::Uuid;

use opsledger_db::entities::{categories, projects, sea_orm_active_enums::UserRole, users};

/// Compact user reference.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Role.
    pub role: UserRole,
}

impl From<users::Model> for UserRef {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Compact reference to a named record.
#[derive(Debug, Serialize)]
pub struct NamedRef {
    /// Record ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
}

impl From<projects::Model> for NamedRef {
    fn from(project: projects::Model) -> Self {
        Self {
            id: project.id,
            name: project.name,
        }
    }
}

impl From<categories::Model> for NamedRef {
    fn from(category: categories::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// Body of delete responses.
#[derive(Debug, Serialize)]
pub struct Deleted {
    /// ID of the removed record.
    pub id: Uuid,
}
