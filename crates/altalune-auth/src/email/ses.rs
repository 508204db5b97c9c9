//! AWS SES Email Provider
//!
//! Optional provider behind the `ses` feature flag.

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use crate::email::sender::EmailSender;
use crate::shared::error::{AuthError, Result};

pub struct SesSender {
    client: aws_sdk_sesv2::Client,
    from_address: String,
}

impl SesSender {
    pub async fn new(region: &str, from_address: impl Into<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if !region.is_empty() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        Self {
            client: aws_sdk_sesv2::Client::new(&config),
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl EmailSender for SesSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let subject = Content::builder()
            .data(subject)
            .build()
            .map_err(|e| AuthError::internal(format!("Invalid SES subject: {}", e)))?;
        let text = Content::builder()
            .data(body)
            .build()
            .map_err(|e| AuthError::internal(format!("Invalid SES body: {}", e)))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(text).build())
            .build();

        let content = EmailContent::builder().simple(message).build();

        self.client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(Destination::builder().to_addresses(to).build())
            .content(content)
            .send()
            .await
            .map_err(|e| AuthError::internal(format!("SES send failed: {}", e)))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "ses"
    }
}
