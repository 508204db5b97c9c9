//! User Consent Entity
//!
//! A persistent record authorizing a client to act with a scope set on
//! behalf of a user. Consent is satisfied when the requested scope set is
//! a subset of the granted, non-revoked set.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConsent {
    /// Public id ("cns_...")
    #[serde(rename = "_id")]
    pub id: String,

    pub user_id: String,

    /// OAuth client_id
    pub client_id: String,

    /// Granted scope (space separated)
    pub scope: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub granted_at: DateTime<Utc>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl UserConsent {
    pub fn new(
        user_id: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::shared::ids::public_id("cns"),
            user_id: user_id.into(),
            client_id: client_id.into(),
            scope: scope.into(),
            granted_at: Utc::now(),
            revoked_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Whether this consent covers all requested scopes.
    pub fn covers(&self, requested: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        let granted: HashSet<&str> = self.scope.split_whitespace().collect();
        requested.split_whitespace().all(|s| granted.contains(s))
    }

    pub fn revoke(&mut self) {
        self.revoked_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_subset() {
        let consent = UserConsent::new("usr_1", "client", "openid profile email");

        assert!(consent.covers("openid"));
        assert!(consent.covers("openid email"));
        assert!(consent.covers("openid profile email"));
        assert!(!consent.covers("openid offline_access"));
    }

    #[test]
    fn test_revoked_consent_covers_nothing() {
        let mut consent = UserConsent::new("usr_1", "client", "openid");
        assert!(consent.covers("openid"));

        consent.revoke();
        assert!(!consent.covers("openid"));
    }

    #[test]
    fn test_empty_request_is_covered() {
        let consent = UserConsent::new("usr_1", "client", "openid");
        assert!(consent.covers(""));
    }
}
