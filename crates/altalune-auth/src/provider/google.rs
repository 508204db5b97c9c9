//! Google Upstream Client
//!
//! Exchanges the authorization code at Google's token endpoint, then reads
//! the OpenID Connect userinfo endpoint with the returned access token.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

use crate::provider::upstream::{split_name, UpstreamClient, UpstreamUserInfo};
use crate::shared::error::{AuthError, Result};

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

pub struct GoogleClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleClient {
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
            userinfo_endpoint: USERINFO_ENDPOINT.to_string(),
        }
    }

    /// Override endpoints, used by tests to point at a mock server.
    pub fn with_endpoints(
        mut self,
        token_endpoint: impl Into<String>,
        userinfo_endpoint: impl Into<String>,
    ) -> Self {
        self.token_endpoint = token_endpoint.into();
        self.userinfo_endpoint = userinfo_endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[async_trait]
impl UpstreamClient for GoogleClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            AUTHORIZE_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code_for_user_info(&self, code: &str) -> Result<UpstreamUserInfo> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("Google token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AuthError::upstream(format!(
                "Google token endpoint returned {}",
                status
            )));
        }

        let tokens: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Invalid Google token response: {}", e)))?;

        let userinfo: GoogleUserInfo = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(&tokens.access_token)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("Google userinfo request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Invalid Google userinfo: {}", e)))?;

        let (first_name, last_name) = match (userinfo.given_name, userinfo.family_name) {
            (Some(first), Some(last)) => (first, last),
            (Some(first), None) => (first, String::new()),
            (None, _) => split_name(userinfo.name.as_deref().unwrap_or_default()),
        };

        Ok(UpstreamUserInfo {
            provider_user_id: userinfo.sub,
            email: userinfo.email.to_lowercase(),
            first_name,
            last_name,
            avatar_url: userinfo.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleClient {
        GoogleClient::new(
            "google-client-id".to_string(),
            "google-client-secret".to_string(),
            "https://auth.example.com/auth/callback".to_string(),
            "openid email profile".to_string(),
        )
        .with_endpoints(
            format!("{}/token", server.uri()),
            format!("{}/userinfo", server.uri()),
        )
    }

    #[test]
    fn test_authorize_url() {
        let client = GoogleClient::new(
            "cid".to_string(),
            "secret".to_string(),
            "https://auth.example.com/auth/callback".to_string(),
            "openid email".to_string(),
        );

        let url = client.authorize_url("state-123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=upstream-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "g1",
                "email": "A@B.com",
                "given_name": "A",
                "family_name": "B",
                "picture": "https://lh3.example/photo.jpg"
            })))
            .mount(&server)
            .await;

        let info = client(&server)
            .exchange_code_for_user_info("upstream-code")
            .await
            .unwrap();

        assert_eq!(info.provider_user_id, "g1");
        assert_eq!(info.email, "a@b.com");
        assert_eq!(info.first_name, "A");
        assert_eq!(info.last_name, "B");
        assert_eq!(info.avatar_url.as_deref(), Some("https://lh3.example/photo.jpg"));
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .exchange_code_for_user_info("bad-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }
}
