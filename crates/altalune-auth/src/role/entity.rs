//! Role and Permission Entities
//!
//! Global (non-project-partitioned) RBAC model. Permission names follow
//! `<entity>:<action>`; the special name `root` grants everything.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// The super-permission. A user whose effective set contains it passes
/// every authorization check.
pub const ROOT_PERMISSION: &str = "root";

/// Valid permission names: alphanumerics, underscores and colons.
fn permission_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_:]+$").expect("valid regex"))
}

/// Check whether a permission name is well-formed.
pub fn is_valid_permission_name(name: &str) -> bool {
    !name.is_empty() && permission_name_pattern().is_match(name)
}

/// Permission descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Permission name (e.g. "employee:read", "employee:write")
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Role definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Public id ("rol_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Role code (unique), e.g. "user", "admin"
    pub code: String,

    /// Human-readable display name
    pub display_name: String,

    /// Permissions granted by this role
    #[serde(default)]
    pub permissions: HashSet<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("rol"),
            code: code.into(),
            display_name: display_name.into(),
            permissions: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_permissions(
        mut self,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        for p in permissions {
            self.permissions.insert(p.into());
        }
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(ROOT_PERMISSION) || self.permissions.contains(permission)
    }
}

/// Built-in roles every deployment starts with.
pub mod roles {
    use super::*;

    /// Default role assigned to every federated login.
    pub fn user() -> Role {
        Role::new("user", "User")
    }

    /// Holder of the `root` super-permission.
    pub fn superadmin() -> Role {
        Role::new("superadmin", "Super Administrator").with_permission(ROOT_PERMISSION)
    }

    pub fn all() -> Vec<Role> {
        vec![user(), superadmin()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_name_validation() {
        assert!(is_valid_permission_name("employee:read"));
        assert!(is_valid_permission_name("root"));
        assert!(is_valid_permission_name("api_key:create"));
        assert!(is_valid_permission_name("a:b:c"));

        assert!(!is_valid_permission_name(""));
        assert!(!is_valid_permission_name("employee read"));
        assert!(!is_valid_permission_name("employee-read"));
        assert!(!is_valid_permission_name("employee.read"));
    }

    #[test]
    fn test_role_permission_check() {
        let role = Role::new("editor", "Editor")
            .with_permission("employee:read")
            .with_permission("employee:write");

        assert!(role.has_permission("employee:read"));
        assert!(!role.has_permission("employee:delete"));
    }

    #[test]
    fn test_root_grants_everything() {
        let role = roles::superadmin();
        assert!(role.has_permission("anything:at_all"));
        assert!(role.has_permission("employee:delete"));
    }

    #[test]
    fn test_built_in_roles() {
        let all = roles::all();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.code == "user"));
        assert!(all.iter().any(|r| r.permissions.contains(ROOT_PERMISSION)));
    }
}
