//! Authorization Code Domain Model
//!
//! Short-lived single-use credential exchanged for tokens. Single use is
//! the nullable `exchange_at` timestamp: consumption is an atomic
//! conditional update from NULL, never a row deletion.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::pkce::CodeChallengeMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// The code value (UUID), also the document id
    #[serde(rename = "_id")]
    pub code: String,

    /// OAuth client_id the code was issued to
    pub client_id: String,

    /// Authenticated user public id
    pub user_id: String,

    /// Redirect URI of the authorization request; the token exchange must
    /// present exactly this value
    pub redirect_uri: String,

    /// Granted scope (space separated)
    pub scope: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// PKCE challenge, when the request carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<CodeChallengeMethod>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,

    /// Set on first successful exchange; a non-null value means consumed
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub exchange_at: Option<DateTime<Utc>>,
}

impl AuthorizationCode {
    pub fn new(
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            code: crate::shared::ids::uuid_string(),
            client_id: client_id.into(),
            user_id: user_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
            exchange_at: None,
        }
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_pkce(mut self, challenge: String, method: CodeChallengeMethod) -> Self {
        self.code_challenge = Some(challenge);
        self.code_challenge_method = Some(method);
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.exchange_at.is_some()
    }

    pub fn is_valid(&self) -> bool {
        !self.is_consumed() && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_code() {
        let code = AuthorizationCode::new(
            "client-uuid",
            "usr_1",
            "https://app/cb",
            "openid email",
            600,
        );

        assert!(uuid::Uuid::parse_str(&code.code).is_ok());
        assert!(code.is_valid());
        assert!(!code.is_consumed());
        assert!(code.expires_at > code.created_at);
    }

    #[test]
    fn test_consumed_code_invalid() {
        let mut code =
            AuthorizationCode::new("client-uuid", "usr_1", "https://app/cb", "openid", 600);
        code.exchange_at = Some(Utc::now());
        assert!(!code.is_valid());
    }

    #[test]
    fn test_expired_code_invalid() {
        let code = AuthorizationCode::new("client-uuid", "usr_1", "https://app/cb", "openid", -1);
        assert!(code.is_expired());
        assert!(!code.is_valid());
    }

    #[test]
    fn test_with_pkce() {
        let code = AuthorizationCode::new("c", "u", "https://app/cb", "openid", 600)
            .with_pkce("challenge".to_string(), CodeChallengeMethod::S256);

        assert_eq!(code.code_challenge.as_deref(), Some("challenge"));
        assert_eq!(code.code_challenge_method, Some(CodeChallengeMethod::S256));
    }
}
