//! Roles and the authenticated principal.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Application role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full access, including administrative deletes.
    Admin,
    /// Finance staff: invoices, approvals, reporting.
    Finance,
    /// Project manager: own projects and their invoices.
    #[serde(rename = "PROJECTMANAGER")]
    ProjectManager,
    /// Regular employee: own claims and assigned projects.
    Employees,
}

impl Role {
    /// Every role.
    pub const ALL: [Self; 4] = [
        Self::Admin,
        Self::Finance,
        Self::ProjectManager,
        Self::Employees,
    ];

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Finance => "FINANCE",
            Self::ProjectManager => "PROJECTMANAGER",
            Self::Employees => "EMPLOYEES",
        }
    }

    /// Parses a role from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "FINANCE" => Some(Self::Finance),
            "PROJECTMANAGER" => Some(Self::ProjectManager),
            "EMPLOYEES" => Some(Self::Employees),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// User id (token subject).
    pub user_id: Uuid,
    /// Role from the token.
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub const fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("projectmanager"), Some(Role::ProjectManager));
        assert_eq!(Role::parse("Finance"), Some(Role::Finance));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::ProjectManager.to_string(), "PROJECTMANAGER");
    }
}
