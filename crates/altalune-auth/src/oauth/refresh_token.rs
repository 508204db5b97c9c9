//! Refresh Token Entity
//!
//! Opaque single-use UUID credentials, rotated on every refresh. A
//! consumed token presented again is treated as potential compromise and
//! rejected with `invalid_grant`.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// The token value (UUID), also the document id
    #[serde(rename = "_id")]
    pub token: String,

    /// OAuth client_id the token is bound to
    pub client_id: String,

    /// User public id
    pub user_id: String,

    /// Granted scope (space separated), carried through rotations
    pub scope: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,

    /// Set on use; rotation issues a fresh token and consumes this one
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub exchange_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn new(
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        scope: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            token: crate::shared::ids::uuid_string(),
            client_id: client_id.into(),
            user_id: user_id.into(),
            scope: scope.into(),
            nonce: None,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
            exchange_at: None,
        }
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
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
    fn test_new_token() {
        let token = RefreshToken::new("client-uuid", "usr_1", "openid email", 2_592_000);
        assert!(uuid::Uuid::parse_str(&token.token).is_ok());
        assert!(token.is_valid());
        assert_eq!(token.scope, "openid email");
    }

    #[test]
    fn test_consumed_token_invalid() {
        let mut token = RefreshToken::new("c", "u", "openid", 2_592_000);
        token.exchange_at = Some(Utc::now());
        assert!(!token.is_valid());
    }

    #[test]
    fn test_expired_token_invalid() {
        let token = RefreshToken::new("c", "u", "openid", -1);
        assert!(!token.is_valid());
    }
}
