//! Session Data
//!
//! The state carried by the signed session cookie. Everything here is
//! client-visible (but tamper-proof); nothing secret is stored in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-browser session state, serialized into the signed cookie.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Authenticated user public id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// When the user authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<DateTime<Utc>>,

    /// State token for an in-flight upstream OAuth exchange
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_state: Option<String>,

    /// URL to return to after login (e.g. a deferred authorize request)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,

    /// Upstream provider selected for the in-flight login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// CSRF token expected on the next state-changing form submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl SessionData {
    /// Whether the session belongs to an authenticated user.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Mark the session authenticated and drop in-flight login state.
    pub fn authenticate(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
        self.authenticated_at = Some(Utc::now());
        self.oauth_state = None;
        self.provider = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_clears_login_state() {
        let mut session = SessionData {
            oauth_state: Some("state".to_string()),
            provider: Some("google".to_string()),
            original_url: Some("/oauth/authorize?client_id=x".to_string()),
            ..Default::default()
        };

        session.authenticate("usr_1");

        assert!(session.is_authenticated());
        assert!(session.authenticated_at.is_some());
        assert!(session.oauth_state.is_none());
        assert!(session.provider.is_none());
        // original_url survives so the deferred request can be replayed
        assert!(session.original_url.is_some());
    }
}
