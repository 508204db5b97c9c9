//! User Registration
//!
//! Find-or-create on federated login: create the user plus identity plus
//! project membership on first login, link a new identity to an existing
//! user on matching email, or just record the login otherwise.

use std::sync::Arc;
use tracing::{info, warn};

use crate::client::entity::OAuthClient;
use crate::email::sender::EmailService;
use crate::login::verification::EmailVerificationToken;
use crate::login::verification_repository::VerificationTokenRepository;
use crate::project::entity::{ProjectMember, ProjectRole, DEFAULT_PROJECT_ID};
use crate::project::repository::ProjectMemberRepository;
use crate::provider::entity::ProviderType;
use crate::provider::upstream::UpstreamUserInfo;
use crate::shared::error::{AuthError, Result};
use crate::user::entity::User;
use crate::user::identity::UserIdentity;
use crate::user::repository::{UserIdentityRepository, UserRepository};

pub struct RegistrationService {
    users: Arc<UserRepository>,
    identities: Arc<UserIdentityRepository>,
    members: Arc<ProjectMemberRepository>,
    verifications: Arc<VerificationTokenRepository>,
    email: Arc<EmailService>,
    auto_activate: bool,
    external_base: String,
}

impl RegistrationService {
    pub fn new(
        users: Arc<UserRepository>,
        identities: Arc<UserIdentityRepository>,
        members: Arc<ProjectMemberRepository>,
        verifications: Arc<VerificationTokenRepository>,
        email: Arc<EmailService>,
        auto_activate: bool,
        external_base: impl Into<String>,
    ) -> Self {
        Self {
            users,
            identities,
            members,
            verifications,
            email,
            auto_activate,
            external_base: external_base.into(),
        }
    }

    /// Find or create the user for a completed upstream login.
    ///
    /// `oauth_client` is the client whose authorize request deferred to
    /// login, when there was one; it determines the project and role of a
    /// newly created member.
    pub async fn find_or_create(
        &self,
        info: &UpstreamUserInfo,
        provider: ProviderType,
        oauth_client: Option<&OAuthClient>,
    ) -> Result<User> {
        let email = info.email.trim().to_lowercase();

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => {
                self.link_or_touch_identity(&user, info, provider, oauth_client)
                    .await?;
                user
            }
            None => self.create_user(info, provider, oauth_client).await?,
        };

        if !user.is_active {
            return Err(AuthError::unauthorized("Account is deactivated"));
        }

        Ok(user)
    }

    async fn create_user(
        &self,
        info: &UpstreamUserInfo,
        provider: ProviderType,
        oauth_client: Option<&OAuthClient>,
    ) -> Result<User> {
        let mut user = User::new(&info.email, &info.first_name, &info.last_name);
        user.assign_role("user");
        if self.auto_activate {
            user.activate();
        } else {
            // Admin activation required before the first successful login
            user.is_active = false;
        }
        self.users.insert(&user).await?;

        let identity = UserIdentity::new(&user.id, provider, &info.provider_user_id, &info.email)
            .with_oauth_client(oauth_client.map(|c| c.client_id.clone()));
        self.identities.insert(&identity).await?;

        // Project and role are derived from the registration context: the
        // dashboard (default) client enrolls members, everything else
        // enrolls plain users.
        let (project_id, role) = match oauth_client {
            Some(client) if client.is_default => (client.project_id.as_str(), ProjectRole::Member),
            Some(client) => (client.project_id.as_str(), ProjectRole::User),
            None => (DEFAULT_PROJECT_ID, ProjectRole::User),
        };
        self.members
            .insert_if_absent(&ProjectMember::new(project_id, &user.id, role))
            .await?;

        if self.auto_activate {
            self.issue_verification(&user).await;
        }

        info!(
            user_id = %user.id,
            provider = %provider,
            project_id = %project_id,
            "User registered via federated login"
        );

        Ok(user)
    }

    async fn link_or_touch_identity(
        &self,
        user: &User,
        info: &UpstreamUserInfo,
        provider: ProviderType,
        oauth_client: Option<&OAuthClient>,
    ) -> Result<()> {
        match self
            .identities
            .find_by_user_and_provider(&user.id, provider)
            .await?
        {
            Some(identity) => {
                self.identities.update_last_login(&identity.id).await?;
            }
            None => {
                // Account linkage by email: same address, new provider
                let identity =
                    UserIdentity::new(&user.id, provider, &info.provider_user_id, &info.email)
                        .with_oauth_client(oauth_client.map(|c| c.client_id.clone()));
                self.identities.insert(&identity).await?;
                info!(user_id = %user.id, provider = %provider, "Linked new identity to existing user");
            }
        }
        Ok(())
    }

    /// Issue a verification token and dispatch the email. Failures are
    /// logged; registration itself has already succeeded.
    pub async fn issue_verification(&self, user: &User) {
        let raw_token = crate::crypto::random::url_safe_token();
        let token = EmailVerificationToken::new(&user.id, &raw_token);

        if let Err(e) = self.verifications.insert(&token).await {
            warn!(error = %e, user_id = %user.id, "Failed to store verification token");
            return;
        }

        let verify_url = format!(
            "{}/verify-email?token={}",
            self.external_base,
            urlencoding::encode(&raw_token)
        );
        if let Err(e) = self.email.send_verification(&user.email, &verify_url).await {
            warn!(error = %e, user_id = %user.id, "Failed to send verification email");
        }
    }
}
