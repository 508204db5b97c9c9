//! Email Verification Token Entity
//!
//! Issued on user creation (auto-activate) or on admin activation.
//! Single-use, 24 hour TTL, stored as a SHA-256 hex digest of the raw
//! token delivered by email.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::login::otp::hash_token;

/// Verification link lifetime.
pub const VERIFICATION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailVerificationToken {
    /// Public id ("evt_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// User the token verifies
    pub user_id: String,

    /// SHA-256 hex digest of the raw token
    pub token_hash: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub used_at: Option<DateTime<Utc>>,
}

impl EmailVerificationToken {
    /// Create a token row from the raw token that goes into the email.
    pub fn new(user_id: impl Into<String>, raw_token: &str) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("evt"),
            user_id: user_id.into(),
            token_hash: hash_token(raw_token),
            created_at: now,
            expires_at: now + Duration::seconds(VERIFICATION_TTL_SECS),
            used_at: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && Utc::now() <= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token() {
        let token = EmailVerificationToken::new("usr_1", "raw-token");
        assert_eq!(token.token_hash, hash_token("raw-token"));
        assert!(token.is_valid());
        let ttl = token.expires_at - token.created_at;
        assert_eq!(ttl.num_hours(), 24);
    }
}
