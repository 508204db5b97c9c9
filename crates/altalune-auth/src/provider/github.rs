//! GitHub Upstream Client
//!
//! GitHub's user endpoint does not reliably include an email, so after the
//! code exchange a secondary call to `/user/emails` selects the primary
//! verified address.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

use crate::provider::upstream::{split_name, UpstreamClient, UpstreamUserInfo};
use crate::shared::error::{AuthError, Result};

const AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
const API_BASE: &str = "https://api.github.com";

pub struct GithubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: String,
    token_endpoint: String,
    api_base: String,
}

impl GithubClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
        scopes: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_url,
            scopes,
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Override endpoints, used by tests to point at a mock server.
    pub fn with_endpoints(
        mut self,
        token_endpoint: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        self.token_endpoint = token_endpoint.into();
        self.api_base = api_base.into();
        self
    }

    async fn fetch_primary_email(&self, access_token: &str) -> Result<String> {
        let emails: Vec<GithubEmail> = self
            .http
            .get(format!("{}/user/emails", self.api_base))
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "altalune-auth")
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("GitHub emails request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Invalid GitHub emails response: {}", e)))?;

        emails
            .iter()
            .find(|e| e.primary && e.verified)
            .or_else(|| emails.iter().find(|e| e.verified))
            .map(|e| e.email.to_lowercase())
            .ok_or_else(|| AuthError::upstream("GitHub account has no verified email"))
    }
}

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[async_trait]
impl UpstreamClient for GithubClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            AUTHORIZE_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code_for_user_info(&self, code: &str) -> Result<UpstreamUserInfo> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("GitHub token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            error!(status = %status, "GitHub token exchange failed");
            return Err(AuthError::upstream(format!(
                "GitHub token endpoint returned {}",
                status
            )));
        }

        let tokens: GithubTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Invalid GitHub token response: {}", e)))?;

        let user: GithubUser = self
            .http
            .get(format!("{}/user", self.api_base))
            .bearer_auth(&tokens.access_token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "altalune-auth")
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("GitHub user request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Invalid GitHub user response: {}", e)))?;

        let email = match user.email {
            Some(email) if !email.is_empty() => email.to_lowercase(),
            _ => self.fetch_primary_email(&tokens.access_token).await?,
        };

        let (first_name, last_name) = split_name(user.name.as_deref().unwrap_or_default());

        Ok(UpstreamUserInfo {
            provider_user_id: user.id.to_string(),
            email,
            first_name,
            last_name,
            avatar_url: user.avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GithubClient {
        GithubClient::new(
            "gh-client-id".to_string(),
            "gh-client-secret".to_string(),
            "https://auth.example.com/auth/callback".to_string(),
            "read:user user:email".to_string(),
        )
        .with_endpoints(format!("{}/login/oauth/access_token", server.uri()), server.uri())
    }

    #[tokio::test]
    async fn test_exchange_with_secondary_email_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_token",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;

        // The user payload carries no email, forcing the /user/emails call
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 4242,
                "name": "Grace Hopper",
                "email": null,
                "avatar_url": "https://avatars.example/4242"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "email": "old@example.com", "primary": false, "verified": true },
                { "email": "Grace@Example.com", "primary": true, "verified": true }
            ])))
            .mount(&server)
            .await;

        let info = client(&server)
            .exchange_code_for_user_info("gh-code")
            .await
            .unwrap();

        assert_eq!(info.provider_user_id, "4242");
        assert_eq!(info.email, "grace@example.com");
        assert_eq!(info.first_name, "Grace");
        assert_eq!(info.last_name, "Hopper");
    }

    #[tokio::test]
    async fn test_no_verified_email_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_token"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7,
                "name": null,
                "email": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "email": "unverified@example.com", "primary": true, "verified": false }
            ])))
            .mount(&server)
            .await;

        let err = client(&server)
            .exchange_code_for_user_info("gh-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }
}
