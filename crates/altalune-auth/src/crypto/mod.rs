//! Crypto Substrate
//!
//! RS256 signing, Argon2id hashing, PKCE verification, secure random
//! material, and symmetric encryption for provider secrets.

pub mod keys;
pub mod password;
pub mod pkce;
pub mod random;
pub mod secret_box;
pub mod token_service;

pub use keys::JwtKeys;
pub use password::PasswordService;
pub use secret_box::SecretBox;
pub use token_service::{AccessTokenClaims, TokenService};
