//! OAuth Client Entity
//!
//! Registered client applications. Public clients cannot keep a secret and
//! must use PKCE; confidential clients authenticate with an Argon2id-hashed
//! secret. Each project has exactly one default client.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::{AuthError, Result};

/// OAuth client registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClient {
    /// Public id ("oac_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning project public id
    pub project_id: String,

    /// Human-readable name, unique within the project
    pub name: String,

    /// OAuth client_id (UUID, globally unique)
    pub client_id: String,

    /// Argon2id hash of the client secret; present iff confidential.
    /// Never projected into read responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Registered redirect URIs; matching is exact string equality
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Whether PKCE is required; always true for public clients
    #[serde(default)]
    pub pkce_required: bool,

    /// Whether the client can keep a secret
    #[serde(default)]
    pub confidential: bool,

    /// Exactly one default client per project; cannot be deleted and
    /// cannot disable PKCE
    #[serde(default)]
    pub is_default: bool,

    /// Scopes this client may request
    #[serde(default)]
    pub allowed_scopes: Vec<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OAuthClient {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("oac"),
            project_id: project_id.into(),
            name: name.into(),
            client_id: crate::shared::ids::uuid_string(),
            client_secret_hash: None,
            redirect_uris: vec![],
            pkce_required: true,
            confidential: false,
            is_default: false,
            allowed_scopes: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    pub fn with_allowed_scopes(
        mut self,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Exact string equality over the registered list. No wildcards, no
    /// substring matching, no case folding, no path normalization.
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Enforce the client invariants. Called by the service on create and
    /// update.
    pub fn validate(&self) -> Result<()> {
        if !self.confidential && !self.pkce_required {
            return Err(AuthError::validation(
                "Public clients must require PKCE",
            ));
        }
        if self.confidential && self.client_secret_hash.is_none() {
            return Err(AuthError::validation(
                "Confidential clients must have a client secret",
            ));
        }
        if self.is_default && !self.pkce_required {
            return Err(AuthError::validation(
                "The default client cannot disable PKCE",
            ));
        }
        for uri in &self.redirect_uris {
            validate_redirect_uri(uri)?;
        }
        Ok(())
    }
}

/// A redirect URI must parse as http or https and carry no wildcard or
/// query component.
pub fn validate_redirect_uri(uri: &str) -> Result<()> {
    let parsed = url::Url::parse(uri)
        .map_err(|e| AuthError::validation(format!("Invalid redirect URI '{}': {}", uri, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AuthError::validation(format!(
                "Redirect URI scheme must be http or https, got '{}'",
                other
            )));
        }
    }

    if uri.contains('*') || uri.contains('?') {
        return Err(AuthError::validation(
            "Redirect URIs may not contain '*' or '?'",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_matching_is_exact() {
        let client = OAuthClient::new("proj_1", "App").with_redirect_uri("https://x/cb");

        assert!(client.is_redirect_uri_allowed("https://x/cb"));
        assert!(!client.is_redirect_uri_allowed("https://x/cb/"));
        assert!(!client.is_redirect_uri_allowed("https://x/cb?foo=1"));
        assert!(!client.is_redirect_uri_allowed("https://X/cb"));
        assert!(!client.is_redirect_uri_allowed("http://x/cb"));
    }

    #[test]
    fn test_public_client_requires_pkce() {
        let mut client = OAuthClient::new("proj_1", "SPA");
        assert!(client.validate().is_ok());

        client.pkce_required = false;
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_confidential_requires_secret_hash() {
        let mut client = OAuthClient::new("proj_1", "Backend");
        client.confidential = true;
        assert!(client.validate().is_err());

        client.client_secret_hash = Some("$argon2id$v=19$...".to_string());
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_default_client_cannot_disable_pkce() {
        let mut client = OAuthClient::new("proj_1", "Dashboard");
        client.confidential = true;
        client.client_secret_hash = Some("$argon2id$v=19$...".to_string());
        client.is_default = true;
        client.pkce_required = false;
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_redirect_uri_validation() {
        assert!(validate_redirect_uri("https://app.example.com/cb").is_ok());
        assert!(validate_redirect_uri("http://localhost:3000/cb").is_ok());

        assert!(validate_redirect_uri("ftp://x/cb").is_err());
        assert!(validate_redirect_uri("not a url").is_err());
        assert!(validate_redirect_uri("https://x/cb?next=1").is_err());
        assert!(validate_redirect_uri("https://*.example.com/cb").is_err());
    }

    #[test]
    fn test_client_id_is_uuid() {
        let client = OAuthClient::new("proj_1", "App");
        assert!(uuid::Uuid::parse_str(&client.client_id).is_ok());
    }
}
