//! Access Token Service
//!
//! RS256 JWT generation and validation. Access tokens carry the user's
//! identity plus the `perms` and `memberships` claims so relying parties
//! can compute capability without a round trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::keys::JwtKeys;
use crate::shared::error::{AuthError, Result};
use crate::user::entity::User;

/// JWT Claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer
    pub iss: String,

    /// Subject (user public id)
    pub sub: String,

    /// Audience (requesting OAuth client_id)
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Granted scope (space separated)
    pub scope: String,

    /// User email
    pub email: String,

    /// Display name
    pub name: String,

    /// Whether the email was verified at issue time
    pub email_verified: bool,

    /// Effective permissions (role permissions plus direct grants)
    pub perms: Vec<String>,

    /// Project memberships: project public id -> role
    pub memberships: BTreeMap<String, String>,
}

/// Access token service
pub struct TokenService {
    keys: JwtKeys,
    issuer: String,
    access_token_expiry_secs: i64,
}

impl TokenService {
    pub fn new(keys: JwtKeys, issuer: impl Into<String>, access_token_expiry_secs: i64) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            access_token_expiry_secs,
        }
    }

    /// The configured key identifier, published in JWKS and JOSE headers.
    pub fn kid(&self) -> &str {
        &self.keys.kid
    }

    /// RSA public key components for JWKS publication.
    pub fn rsa_components(&self) -> &crate::crypto::keys::RsaComponents {
        &self.keys.components
    }

    /// Access token lifetime in seconds (the `expires_in` of token responses).
    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_token_expiry_secs
    }

    /// Issue an access token for a user in the context of an OAuth client.
    pub fn issue_access_token(
        &self,
        user: &User,
        client_id: &str,
        scope: &str,
        perms: Vec<String>,
        memberships: BTreeMap<String, String>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry_secs);

        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            aud: vec![client_id.to_string()],
            exp: exp.timestamp(),
            iat: now.timestamp(),
            scope: scope.to_string(),
            email: user.email.clone(),
            name: user.display_name(),
            email_verified: user.email_verified,
            perms,
            memberships,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.kid.clone());

        encode(&header, &claims, &self.keys.encoding_key).map_err(|e| AuthError::Internal {
            message: format!("Failed to encode JWT: {}", e),
        })
    }

    /// Validate a token and extract its claims.
    ///
    /// Verifies signature, issuer and expiry; when `expected_audience` is
    /// given the `aud` claim must contain it.
    pub fn validate(
        &self,
        token: &str,
        expected_audience: Option<&str>,
    ) -> Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        match expected_audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        decode::<AccessTokenClaims>(token, &self.keys.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken {
                    message: format!("{}", e),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        let (private_pem, public_pem) = JwtKeys::generate_pem_pair().unwrap();
        let keys = JwtKeys::from_pem(&private_pem, &public_pem, "test-kid").unwrap();
        TokenService::new(keys, "altalune-oauth", 3600)
    }

    fn test_user() -> User {
        let mut user = User::new("a@b.com", "A", "B");
        user.id = "usr_test".to_string();
        user
    }

    #[test]
    fn test_issue_and_validate() {
        let service = test_service();
        let user = test_user();

        let mut memberships = BTreeMap::new();
        memberships.insert("proj_1".to_string(), "admin".to_string());

        let token = service
            .issue_access_token(
                &user,
                "client-uuid",
                "openid email",
                vec!["employee:read".to_string()],
                memberships,
            )
            .unwrap();

        let claims = service.validate(&token, Some("client-uuid")).unwrap();
        assert_eq!(claims.iss, "altalune-oauth");
        assert_eq!(claims.sub, "usr_test");
        assert_eq!(claims.aud, vec!["client-uuid".to_string()]);
        assert_eq!(claims.scope, "openid email");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.name, "A B");
        assert!(!claims.email_verified);
        assert_eq!(claims.perms, vec!["employee:read".to_string()]);
        assert_eq!(claims.memberships.get("proj_1").unwrap(), "admin");
    }

    #[test]
    fn test_kid_in_header() {
        let service = test_service();
        let token = service
            .issue_access_token(&test_user(), "c", "openid", vec![], BTreeMap::new())
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("test-kid"));
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_audience_mismatch_rejected() {
        let service = test_service();
        let token = service
            .issue_access_token(&test_user(), "client-a", "openid", vec![], BTreeMap::new())
            .unwrap();

        assert!(service.validate(&token, Some("client-b")).is_err());
        assert!(service.validate(&token, Some("client-a")).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let service_a = test_service();
        let service_b = test_service();

        let token = service_a
            .issue_access_token(&test_user(), "c", "openid", vec![], BTreeMap::new())
            .unwrap();

        assert!(service_b.validate(&token, Some("c")).is_err());
    }

    #[test]
    fn test_email_verified_reflects_user_at_issue_time() {
        let service = test_service();
        let mut user = test_user();

        let token = service
            .issue_access_token(&user, "c", "openid", vec![], BTreeMap::new())
            .unwrap();
        assert!(!service.validate(&token, Some("c")).unwrap().email_verified);

        user.verify_email();
        let token = service
            .issue_access_token(&user, "c", "openid", vec![], BTreeMap::new())
            .unwrap();
        assert!(service.validate(&token, Some("c")).unwrap().email_verified);
    }
}
