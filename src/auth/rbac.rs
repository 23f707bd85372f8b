use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Permission {
    // Own hierarchy, journal, insights and analytics
    ManageOwnData,

    // Operations
    ViewMetrics,
    ManageMetrics,

    // Accounts
    ManageUsers,
}

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &[
                Permission::ManageOwnData,
                Permission::ViewMetrics,
                Permission::ManageMetrics,
                Permission::ManageUsers,
            ],
            Role::Member => &[Permission::ManageOwnData],
        }
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions().contains(permission)
    }
}

/// Return an authorization error from the enclosing handler unless the user
/// holds `$role`.
#[macro_export]
macro_rules! require_role {
    ($user:expr, $role:expr) => {
        if !$user.has_role($role) {
            return Err($crate::error::ApiError::authorization(format!(
                "Role {} required",
                $role
            )));
        }
    };
}

#[macro_export]
macro_rules! require_permission {
    ($user:expr, $perm:expr) => {
        if !$user.has_permission($perm) {
            return Err($crate::error::ApiError::authorization(format!(
                "Permission {:?} required",
                $perm
            )));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Member "), Some(Role::Member));
        assert_eq!(Role::parse("viewer"), None);
        assert_eq!(Role::Member.to_string(), "member");
    }

    #[test]
    fn test_member_cannot_view_metrics() {
        assert!(Role::Member.has_permission(&Permission::ManageOwnData));
        assert!(!Role::Member.has_permission(&Permission::ViewMetrics));
        assert!(Role::Admin.has_permission(&Permission::ManageMetrics));
    }
}
