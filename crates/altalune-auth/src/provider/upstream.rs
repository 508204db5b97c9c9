//! Upstream Provider Abstraction
//!
//! Every upstream identity provider reduces to one capability: exchange an
//! authorization code for normalized user info. New providers implement
//! [`UpstreamClient`]; nothing else in the login flow changes.

use async_trait::async_trait;

use crate::provider::entity::{OAuthProvider, ProviderType};
use crate::provider::github::GithubClient;
use crate::provider::google::GoogleClient;
use crate::provider::service::ProviderService;
use crate::shared::error::{AuthError, Result};

/// Normalized user info returned by an upstream exchange.
#[derive(Debug, Clone)]
pub struct UpstreamUserInfo {
    pub provider_user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Build the upstream authorize URL for a login attempt.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the code echoed to our callback for normalized user info.
    async fn exchange_code_for_user_info(&self, code: &str) -> Result<UpstreamUserInfo>;
}

/// Build the concrete upstream client for a stored provider config.
pub fn build_upstream_client(
    provider: &OAuthProvider,
    providers: &ProviderService,
) -> Result<Box<dyn UpstreamClient>> {
    let client_secret = providers.decrypt_secret(provider)?;

    match provider.provider_type {
        ProviderType::Google => Ok(Box::new(GoogleClient::new(
            provider.client_id.clone(),
            client_secret,
            provider.redirect_url.clone(),
            provider.scopes.clone(),
        ))),
        ProviderType::Github => Ok(Box::new(GithubClient::new(
            provider.client_id.clone(),
            client_secret,
            provider.redirect_url.clone(),
            provider.scopes.clone(),
        ))),
        other => Err(AuthError::Configuration {
            message: format!("No upstream client implementation for provider '{}'", other),
        }),
    }
}

/// Split a full name into (first, last) the way upstream profiles report it.
pub(crate) fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Ada Lovelace"), ("Ada".into(), "Lovelace".into()));
        assert_eq!(
            split_name("Ada King Lovelace"),
            ("Ada".into(), "King Lovelace".into())
        );
        assert_eq!(split_name("Ada"), ("Ada".into(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }
}
