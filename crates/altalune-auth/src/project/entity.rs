//! Project Membership Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project the standalone IDP flow assigns members to when no OAuth client
/// provides a context.
pub const DEFAULT_PROJECT_ID: &str = "proj_1";

/// Role a user holds within a project. A project must retain at least one
/// owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
    User,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's membership in a project. `(project_id, user_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    /// Public id ("pmb_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Project public id
    pub project_id: String,

    /// User public id
    pub user_id: String,

    pub role: ProjectRole,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ProjectMember {
    pub fn new(
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        role: ProjectRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("pmb"),
            project_id: project_id.into(),
            user_id: user_id.into(),
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ProjectRole::Owner).unwrap(), "\"owner\"");
        assert_eq!(serde_json::to_string(&ProjectRole::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_new_member() {
        let member = ProjectMember::new("proj_1", "usr_1", ProjectRole::Member);
        assert_eq!(member.project_id, "proj_1");
        assert_eq!(member.role, ProjectRole::Member);
        assert!(member.id.starts_with("pmb_"));
    }
}
