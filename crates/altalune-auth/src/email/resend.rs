//! Resend Email Provider
//!
//! Sends through the Resend HTTP API (https://resend.com).

use async_trait::async_trait;
use std::time::Duration;
use tracing::error;

use crate::email::sender::EmailSender;
use crate::shared::error::{AuthError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

pub struct ResendSender {
    http: reqwest::Client,
    api_key: String,
    from_address: String,
    api_url: String,
}

impl ResendSender {
    pub fn new(api_key: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            from_address: from_address.into(),
            api_url: RESEND_API_URL.to_string(),
        }
    }

    /// Override the API URL, used by tests to point at a mock server.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let payload = serde_json::json!({
            "from": self.from_address,
            "to": [to],
            "subject": subject,
            "text": body,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("Resend request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Resend rejected email");
            return Err(AuthError::internal(format!(
                "Resend returned {}",
                status
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "email-id"
            })))
            .mount(&server)
            .await;

        let sender = ResendSender::new("re_test_key", "no-reply@altalune.dev")
            .with_api_url(format!("{}/emails", server.uri()));

        sender.send("a@b.com", "Subject", "Body").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let sender = ResendSender::new("bad-key", "no-reply@altalune.dev")
            .with_api_url(format!("{}/emails", server.uri()));

        assert!(sender.send("a@b.com", "Subject", "Body").await.is_err());
    }
}
