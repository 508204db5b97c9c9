//! Audit Log Entity
//!
//! Records security-significant actions: secret reveals and rotations,
//! consent decisions, and single-use credential replays.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Client or provider secret revealed to an actor
    SecretRevealed,
    /// Client secret regenerated
    SecretRotated,
    /// User granted consent to a client/scope pair
    ConsentGranted,
    /// User denied consent
    ConsentDenied,
    /// A consumed authorization code was presented again
    CodeReplayed,
    /// A consumed refresh token was presented again
    RefreshTokenReplayed,
    /// OTP request rejected by the rate limit
    OtpRateLimited,
    /// User logged in
    Login,
    /// User logged out
    Logout,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    /// Public id ("aud_...")
    #[serde(rename = "_id")]
    pub id: String,

    /// Entity type affected (e.g. "OAuthClient", "RefreshToken")
    pub entity_type: String,

    /// Entity id affected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    pub action: AuditAction,

    /// Who performed the action (user public id, or "anonymous")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Additional context as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(entity_type: impl Into<String>, action: AuditAction) -> Self {
        Self {
            id: crate::shared::ids::public_id("aud"),
            entity_type: entity_type.into(),
            entity_id: None,
            action,
            actor: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let entry = AuditLog::new("OAuthClient", AuditAction::SecretRevealed)
            .with_entity_id("oac_1")
            .with_actor("usr_1");

        assert_eq!(entry.entity_type, "OAuthClient");
        assert_eq!(entry.entity_id.as_deref(), Some("oac_1"));
        assert_eq!(entry.actor.as_deref(), Some("usr_1"));
        assert!(entry.id.starts_with("aud_"));
    }

    #[test]
    fn test_action_serde() {
        let json = serde_json::to_string(&AuditAction::SecretRevealed).unwrap();
        assert_eq!(json, "\"SECRET_REVEALED\"");
    }
}
