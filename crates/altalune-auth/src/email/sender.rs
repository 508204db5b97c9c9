//! Email Dispatch
//!
//! Pluggable sender behind the [`EmailSender`] trait; [`EmailService`]
//! owns the message templates for OTP and verification mail.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::shared::error::Result;

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a plain-text email.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Provider name, for logging.
    fn name(&self) -> &str;
}

/// Templated email dispatch for the login flows.
pub struct EmailService {
    sender: Arc<dyn EmailSender>,
}

impl EmailService {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    /// Send a login OTP. The code expires after `expiry_minutes`.
    pub async fn send_otp(&self, to: &str, otp: &str, expiry_minutes: i64) -> Result<()> {
        let subject = "Your Altalune sign-in code";
        let body = format!(
            "Your sign-in code is: {}\n\n\
             Enter it on the sign-in page to continue.\n\n\
             The code expires in {} minutes. If you did not request it, you\n\
             can safely ignore this email.",
            otp, expiry_minutes
        );

        self.sender.send(to, subject, &body).await?;
        info!(provider = %self.sender.name(), "OTP email dispatched");
        Ok(())
    }

    /// Send an email-verification link.
    pub async fn send_verification(&self, to: &str, verify_url: &str) -> Result<()> {
        let subject = "Verify your email address";
        let body = format!(
            "Welcome to Altalune.\n\n\
             To verify your email address, open the following link:\n\
             {}\n\n\
             The link expires in 24 hours.",
            verify_url
        );

        self.sender.send(to, subject, &body).await?;
        info!(provider = %self.sender.name(), "Verification email dispatched");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory sender capturing outgoing mail for assertions.
    #[derive(Default)]
    pub struct CapturingSender {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl EmailSender for CapturingSender {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }

        fn name(&self) -> &str {
            "capturing"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CapturingSender;
    use super::*;

    #[tokio::test]
    async fn test_otp_template() {
        let sender = Arc::new(CapturingSender::default());
        let service = EmailService::new(sender.clone());

        service.send_otp("a@b.com", "123456", 5).await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, subject, body) = &sent[0];
        assert_eq!(to, "a@b.com");
        assert!(subject.contains("sign-in code"));
        assert!(body.contains("123456"));
        assert!(body.contains("5 minutes"));
    }

    #[tokio::test]
    async fn test_verification_template() {
        let sender = Arc::new(CapturingSender::default());
        let service = EmailService::new(sender.clone());

        service
            .send_verification("a@b.com", "https://auth/verify-email?token=t")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert!(sent[0].2.contains("https://auth/verify-email?token=t"));
    }
}
