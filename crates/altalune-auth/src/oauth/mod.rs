//! OAuth 2.1 Core
//!
//! Authorization codes, refresh tokens, consent, scopes, and the
//! authorize/token endpoints.

pub mod authorization_code;
pub mod authorization_code_repository;
pub mod authorize_api;
pub mod consent;
pub mod consent_repository;
pub mod refresh_token;
pub mod refresh_token_repository;
pub mod scope;
pub mod token_api;

pub use authorization_code::AuthorizationCode;
pub use authorization_code_repository::AuthorizationCodeRepository;
pub use authorize_api::{oauth_router, OAuthState};
pub use consent::UserConsent;
pub use consent_repository::UserConsentRepository;
pub use refresh_token::RefreshToken;
pub use refresh_token_repository::RefreshTokenRepository;
pub use scope::{ScopeDescriptor, ScopeRegistry};
