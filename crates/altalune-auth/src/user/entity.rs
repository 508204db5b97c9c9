//! User Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A human user of the identity provider.
///
/// Deactivated users may not authenticate; unverified users may
/// authenticate but receive `email_verified=false` in tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Public id ("usr_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Email address (lowercase, globally unique)
    pub email: String,

    pub first_name: String,
    pub last_name: String,

    /// Whether the user may authenticate
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Whether the email address has been verified
    #[serde(default)]
    pub email_verified: bool,

    /// When the account was activated
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub activated_at: Option<DateTime<Utc>>,

    /// Assigned global role codes (denormalized)
    #[serde(default)]
    pub roles: Vec<String>,

    /// Directly granted permissions, in addition to role permissions
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("usr"),
            email: email.into().trim().to_lowercase(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_active: true,
            email_verified: false,
            activated_at: None,
            roles: vec![],
            permissions: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.email.clone(),
        }
    }

    pub fn assign_role(&mut self, role: impl Into<String>) {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
            self.updated_at = Utc::now();
        }
    }

    pub fn grant_permission(&mut self, permission: impl Into<String>) {
        let permission = permission.into();
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
            self.updated_at = Utc::now();
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.activated_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    pub fn verify_email(&mut self) {
        self.email_verified = true;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_lowercases_email() {
        let user = User::new("  Alice@Example.COM ", "Alice", "Smith");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert!(user.activated_at.is_none());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(User::new("a@b.com", "A", "B").display_name(), "A B");
        assert_eq!(User::new("a@b.com", "A", "").display_name(), "A");
        assert_eq!(User::new("a@b.com", "", "").display_name(), "a@b.com");
    }

    #[test]
    fn test_role_assignment_dedupes() {
        let mut user = User::new("a@b.com", "A", "B");
        user.assign_role("user");
        user.assign_role("user");
        assert_eq!(user.roles, vec!["user".to_string()]);
    }

    #[test]
    fn test_activate_sets_timestamp() {
        let mut user = User::new("a@b.com", "A", "B");
        user.activate();
        assert!(user.is_active);
        assert!(user.activated_at.is_some());
    }
}
