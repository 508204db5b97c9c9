//! OAuth Provider Service
//!
//! Manages upstream provider configurations. The upstream client secret is
//! encrypted before it reaches the repository, and decrypted only for the
//! audited reveal and for building upstream exchange requests. The
//! provider type is immutable after create.

use std::sync::Arc;

use crate::audit::entity::{AuditAction, AuditLog};
use crate::audit::service::AuditService;
use crate::crypto::secret_box::SecretBox;
use crate::provider::entity::{OAuthProvider, ProviderType};
use crate::provider::repository::OAuthProviderRepository;
use crate::shared::error::{AuthError, Result};

pub struct ProviderService {
    repo: Arc<OAuthProviderRepository>,
    secret_box: Arc<SecretBox>,
    audit: Arc<AuditService>,
}

impl ProviderService {
    pub fn new(
        repo: Arc<OAuthProviderRepository>,
        secret_box: Arc<SecretBox>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            secret_box,
            audit,
        }
    }

    pub async fn create(
        &self,
        project_id: &str,
        provider_type: ProviderType,
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
        scopes: &str,
    ) -> Result<OAuthProvider> {
        let encrypted = self.secret_box.encrypt(client_secret)?;
        let provider = OAuthProvider::new(
            project_id,
            provider_type,
            client_id,
            encrypted,
            redirect_url,
            scopes,
        );
        self.repo.insert(&provider).await?;
        Ok(provider)
    }

    /// Update mutable fields. The provider type cannot change; the secret
    /// is re-encrypted only when a new one is supplied.
    pub async fn update(
        &self,
        id: &str,
        client_id: Option<&str>,
        client_secret: Option<&str>,
        redirect_url: Option<&str>,
        scopes: Option<&str>,
        enabled: Option<bool>,
    ) -> Result<OAuthProvider> {
        let mut provider = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthProvider", id))?;

        if let Some(client_id) = client_id {
            provider.client_id = client_id.to_string();
        }
        if let Some(secret) = client_secret {
            provider.encrypted_client_secret = self.secret_box.encrypt(secret)?;
        }
        if let Some(redirect_url) = redirect_url {
            provider.redirect_url = redirect_url.to_string();
        }
        if let Some(scopes) = scopes {
            provider.scopes = scopes.to_string();
        }
        if let Some(enabled) = enabled {
            provider.enabled = enabled;
        }
        provider.updated_at = chrono::Utc::now();

        self.repo.update(&provider).await?;
        Ok(provider)
    }

    /// Audited plaintext reveal. Authorization is re-checked by the caller
    /// on every request; the 30-second visibility window is a client-side
    /// concern.
    pub async fn reveal_secret(&self, id: &str, actor: &str) -> Result<String> {
        let provider = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthProvider", id))?;

        let plaintext = self.secret_box.decrypt(&provider.encrypted_client_secret)?;

        self.audit
            .record(
                AuditLog::new("OAuthProvider", AuditAction::SecretRevealed)
                    .with_entity_id(id)
                    .with_actor(actor),
            )
            .await;

        Ok(plaintext)
    }

    /// Decrypt the secret for internal use (upstream code exchange).
    pub fn decrypt_secret(&self, provider: &OAuthProvider) -> Result<String> {
        self.secret_box.decrypt(&provider.encrypted_client_secret)
    }
}
