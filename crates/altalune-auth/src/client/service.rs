//! OAuth Client Service
//!
//! Lifecycle rules that sit above the repository: secret generation and
//! hashing, one-time plaintext return, rotation, the audited reveal path,
//! and the default-client invariants.

use std::sync::Arc;
use tracing::info;

use crate::audit::entity::{AuditAction, AuditLog};
use crate::audit::service::AuditService;
use crate::client::entity::OAuthClient;
use crate::client::repository::OAuthClientRepository;
use crate::crypto::password::PasswordService;
use crate::crypto::random;
use crate::shared::error::{AuthError, Result};

/// Parameters for creating a client.
pub struct CreateClientParams {
    pub project_id: String,
    pub name: String,
    pub confidential: bool,
    pub pkce_required: bool,
    pub is_default: bool,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
}

/// A freshly created client together with its one-time plaintext secret.
pub struct CreatedClient {
    pub client: OAuthClient,
    /// Present for confidential clients; shown exactly once.
    pub plaintext_secret: Option<String>,
}

pub struct OAuthClientService {
    repo: Arc<OAuthClientRepository>,
    passwords: Arc<PasswordService>,
    audit: Arc<AuditService>,
}

impl OAuthClientService {
    pub fn new(
        repo: Arc<OAuthClientRepository>,
        passwords: Arc<PasswordService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            passwords,
            audit,
        }
    }

    /// Create a client. For confidential clients a 32-character secret is
    /// generated, hashed with Argon2id, and the plaintext returned exactly
    /// once.
    pub async fn create(&self, params: CreateClientParams) -> Result<CreatedClient> {
        if self
            .repo
            .find_by_project_and_name(&params.project_id, &params.name)
            .await?
            .is_some()
        {
            return Err(AuthError::duplicate("OAuthClient", "name", &params.name));
        }

        if params.is_default
            && self
                .repo
                .find_default_for_project(&params.project_id)
                .await?
                .is_some()
        {
            return Err(AuthError::duplicate(
                "OAuthClient",
                "isDefault",
                &params.project_id,
            ));
        }

        let mut client = OAuthClient::new(params.project_id, params.name)
            .with_allowed_scopes(params.allowed_scopes);
        client.redirect_uris = params.redirect_uris;
        client.confidential = params.confidential;
        client.pkce_required = if params.confidential {
            params.pkce_required
        } else {
            // Public clients always require PKCE regardless of the request
            true
        };
        client.is_default = params.is_default;

        let plaintext_secret = if params.confidential {
            let secret = random::client_secret();
            client.client_secret_hash = Some(self.passwords.hash(&secret)?);
            Some(secret)
        } else {
            None
        };

        client.validate()?;
        self.repo.insert(&client).await?;

        info!(client_id = %client.client_id, project_id = %client.project_id, "OAuth client created");

        Ok(CreatedClient {
            client,
            plaintext_secret,
        })
    }

    /// Regenerate the secret of a confidential client. Returns the new
    /// plaintext exactly once.
    pub async fn rotate_secret(&self, id: &str, actor: Option<&str>) -> Result<String> {
        let client = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthClient", id))?;

        if !client.confidential {
            return Err(AuthError::validation(
                "Public clients do not have a secret to rotate",
            ));
        }

        let secret = random::client_secret();
        let hash = self.passwords.hash(&secret)?;
        self.repo.update_secret_hash(id, &hash).await?;

        self.audit
            .record_action("OAuthClient", id, AuditAction::SecretRotated, actor)
            .await;

        Ok(secret)
    }

    /// Audited reveal of the stored secret hash, used by the dedicated
    /// default-client reveal path. The reveal window shown to operators is
    /// advisory; authorization is re-checked on every request.
    pub async fn reveal_secret_hash(&self, id: &str, actor: &str) -> Result<String> {
        let client = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthClient", id))?;

        let hash = client
            .client_secret_hash
            .ok_or_else(|| AuthError::validation("Client has no stored secret"))?;

        self.audit
            .record(
                AuditLog::new("OAuthClient", AuditAction::SecretRevealed)
                    .with_entity_id(id)
                    .with_actor(actor),
            )
            .await;

        Ok(hash)
    }

    /// Update mutable client fields. A new secret is hashed only when one
    /// is supplied; otherwise the stored hash is untouched.
    pub async fn update(
        &self,
        id: &str,
        redirect_uris: Option<Vec<String>>,
        allowed_scopes: Option<Vec<String>>,
        pkce_required: Option<bool>,
        new_secret: Option<&str>,
    ) -> Result<OAuthClient> {
        let mut client = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthClient", id))?;

        if let Some(uris) = redirect_uris {
            client.redirect_uris = uris;
        }
        if let Some(scopes) = allowed_scopes {
            client.allowed_scopes = scopes;
        }
        if let Some(pkce) = pkce_required {
            client.pkce_required = pkce;
        }
        if let Some(secret) = new_secret {
            client.client_secret_hash = Some(self.passwords.hash(secret)?);
        }

        client.validate()?;
        self.repo.update(&client).await?;

        Ok(client)
    }

    /// Delete a client. The project's default client cannot be deleted.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let client = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::not_found("OAuthClient", id))?;

        if client.is_default {
            return Err(AuthError::forbidden(
                "The default client cannot be deleted",
            ));
        }

        self.repo.delete(id).await
    }

    /// Authenticate a confidential client by client_id and secret.
    ///
    /// The caller maps any failure to `invalid_client` without revealing
    /// whether the client_id or the secret was wrong.
    pub async fn authenticate(&self, client_id: &str, secret: &str) -> Result<OAuthClient> {
        let client = self
            .repo
            .find_by_client_id(client_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = client
            .client_secret_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(secret, hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(client)
    }
}
