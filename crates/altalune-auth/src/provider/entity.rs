//! Upstream OAuth Provider Entity
//!
//! Configuration for federating login to an upstream identity provider.
//! The client secret is symmetrically encrypted at rest; plaintext is only
//! exposed through the audited reveal path.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported upstream provider types. Immutable after create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Google,
    Github,
    Microsoft,
    Apple,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Microsoft => "microsoft",
            Self::Apple => "apple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            "microsoft" => Some(Self::Microsoft),
            "apple" => Some(Self::Apple),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProvider {
    /// Public id ("oap_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning project public id
    pub project_id: String,

    /// Provider type; immutable after create
    pub provider_type: ProviderType,

    /// Upstream-assigned client id
    pub client_id: String,

    /// Upstream client secret, AES-256-GCM encrypted
    pub encrypted_client_secret: String,

    /// Callback URL registered with the upstream
    pub redirect_url: String,

    /// Scopes requested from the upstream (space separated)
    pub scopes: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl OAuthProvider {
    pub fn new(
        project_id: impl Into<String>,
        provider_type: ProviderType,
        client_id: impl Into<String>,
        encrypted_client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
        scopes: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("oap"),
            project_id: project_id.into(),
            provider_type,
            client_id: client_id.into(),
            encrypted_client_secret: encrypted_client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: scopes.into(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("google"), Some(ProviderType::Google));
        assert_eq!(ProviderType::parse("github"), Some(ProviderType::Github));
        assert_eq!(ProviderType::parse("okta"), None);
        assert_eq!(ProviderType::parse("Google"), None);
    }

    #[test]
    fn test_provider_type_serde_lowercase() {
        let json = serde_json::to_string(&ProviderType::Github).unwrap();
        assert_eq!(json, "\"github\"");
    }

    #[test]
    fn test_new_provider_enabled() {
        let provider = OAuthProvider::new(
            "proj_1",
            ProviderType::Google,
            "upstream-id",
            "encrypted",
            "https://auth.example.com/auth/callback",
            "openid email profile",
        );
        assert!(provider.enabled);
        assert!(provider.id.starts_with("oap_"));
    }
}
