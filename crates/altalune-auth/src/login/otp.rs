//! OTP Token Entity
//!
//! One-time 6-digit login codes. Only the SHA-256 hex digest of the code
//! is stored; lookups hash the candidate.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpToken {
    /// Public id ("otp_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Email the code was sent to (lowercase)
    pub email: String,

    /// SHA-256 hex digest of the 6-digit code
    pub token_hash: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,

    /// Set when the code is redeemed (single use)
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub used_at: Option<DateTime<Utc>>,
}

impl OtpToken {
    pub fn new(email: impl Into<String>, raw_otp: &str, ttl_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: crate::shared::ids::public_id("otp"),
            email: email.into().trim().to_lowercase(),
            token_hash: hash_token(raw_otp),
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
            used_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && !self.is_expired()
    }
}

/// SHA-256 hex digest of a candidate token. Raw tokens are never stored.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = hash_token("123456");
        assert_eq!(hash.len(), 64);
        // SHA-256("123456")
        assert_eq!(
            hash,
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
    }

    #[test]
    fn test_new_token_hashes() {
        let token = OtpToken::new("A@B.com", "123456", 300);
        assert_eq!(token.email, "a@b.com");
        assert_eq!(token.token_hash, hash_token("123456"));
        assert!(token.is_valid());
    }

    #[test]
    fn test_used_token_invalid() {
        let mut token = OtpToken::new("a@b.com", "123456", 300);
        token.used_at = Some(Utc::now());
        assert!(!token.is_valid());
    }
}
