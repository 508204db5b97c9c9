//! User Identity Entity
//!
//! Links a user to an upstream identity provider account. `(user_id,
//! provider)` is unique: one linked account per provider per user.
//! Records which requesting OAuth client introduced the identity, which
//! drives role assignment at first login.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::entity::ProviderType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Public id ("uid_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning user public id
    pub user_id: String,

    /// Upstream provider this identity came from
    pub provider: ProviderType,

    /// Stable subject id assigned by the upstream provider
    pub provider_user_id: String,

    /// Email reported by the upstream provider (lowercase)
    pub email: String,

    /// client_id of the OAuth client whose flow introduced this identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub last_login_at: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    pub fn new(
        user_id: impl Into<String>,
        provider: ProviderType,
        provider_user_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::shared::ids::public_id("uid"),
            user_id: user_id.into(),
            provider,
            provider_user_id: provider_user_id.into(),
            email: email.into().trim().to_lowercase(),
            oauth_client_id: None,
            last_login_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    pub fn with_oauth_client(mut self, client_id: Option<String>) -> Self {
        self.oauth_client_id = client_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity() {
        let identity = UserIdentity::new("usr_1", ProviderType::Google, "g-123", "A@B.com");
        assert_eq!(identity.user_id, "usr_1");
        assert_eq!(identity.provider, ProviderType::Google);
        assert_eq!(identity.email, "a@b.com");
        assert!(identity.last_login_at.is_some());
        assert!(identity.oauth_client_id.is_none());
    }

    #[test]
    fn test_with_oauth_client() {
        let identity = UserIdentity::new("usr_1", ProviderType::Github, "gh-9", "a@b.com")
            .with_oauth_client(Some("client-uuid".to_string()));
        assert_eq!(identity.oauth_client_id.as_deref(), Some("client-uuid"));
    }
}
