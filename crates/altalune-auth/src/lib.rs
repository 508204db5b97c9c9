//! Altalune Auth
//!
//! Identity provider and OAuth 2.1 authorization server core:
//! - Authorization-code and refresh-token grants with PKCE enforcement
//! - Federated login to upstream providers (Google, GitHub)
//! - OTP login and email verification
//! - Consent lifecycle and HMAC-signed cookie sessions
//! - RS256 access tokens carrying `perms` and `memberships` claims
//! - JWKS publication and a token-exchange proxy for public SPA clients
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - HTTP endpoints (where the aggregate has a surface)
//! - `service` - Lifecycle rules above the repository

// Core aggregates
pub mod client;
pub mod project;
pub mod provider;
pub mod role;
pub mod user;

// OAuth core
pub mod oauth;

// Login flows
pub mod login;

// Cross-cutting concerns
pub mod audit;
pub mod crypto;
pub mod email;
pub mod proxy;
pub mod session;

// Shared infrastructure
pub mod shared;

// Re-export common types from shared
pub use shared::error::{AuthError, Result};

// Re-export main entity types for convenience
pub use client::entity::OAuthClient;
pub use login::otp::OtpToken;
pub use login::verification::EmailVerificationToken;
pub use oauth::authorization_code::AuthorizationCode;
pub use oauth::consent::UserConsent;
pub use oauth::refresh_token::RefreshToken;
pub use project::entity::{ProjectMember, ProjectRole};
pub use provider::entity::{OAuthProvider, ProviderType};
pub use role::entity::{Permission, Role, ROOT_PERMISSION};
pub use session::data::SessionData;
pub use user::entity::User;
pub use user::identity::UserIdentity;

// Re-export repositories
pub use audit::repository::AuditLogRepository;
pub use client::repository::OAuthClientRepository;
pub use login::otp_repository::OtpTokenRepository;
pub use login::verification_repository::VerificationTokenRepository;
pub use oauth::authorization_code_repository::AuthorizationCodeRepository;
pub use oauth::consent_repository::UserConsentRepository;
pub use oauth::refresh_token_repository::RefreshTokenRepository;
pub use project::repository::ProjectMemberRepository;
pub use provider::repository::OAuthProviderRepository;
pub use role::repository::RoleRepository;
pub use user::repository::{UserIdentityRepository, UserRepository};

// Re-export services
pub use audit::service::AuditService;
pub use client::service::OAuthClientService;
pub use crypto::password::PasswordService;
pub use crypto::secret_box::SecretBox;
pub use crypto::token_service::{AccessTokenClaims, TokenService};
pub use email::sender::{EmailSender, EmailService};
pub use provider::service::ProviderService;
pub use role::claims_service::ClaimsService;
pub use session::store::SessionStore;
pub use user::registration::RegistrationService;

/// API state and router re-exports
pub mod api {
    pub use crate::login::login_api::{login_router, LoginState};
    pub use crate::login::otp_api::{otp_router, OtpState};
    pub use crate::oauth::authorize_api::{oauth_router, OAuthState};
    pub use crate::proxy::exchange_api::{exchange_router, ExchangeState};
    pub use crate::shared::health_api::{health_router, HealthState};
    pub use crate::shared::well_known_api::{well_known_router, WellKnownState};
}
