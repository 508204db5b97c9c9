//! Authorization Server Integration Tests
//!
//! Tests for the domain models, crypto substrate, and the laws the token
//! machinery must uphold. Flows that need a live MongoDB are covered by
//! the repository layer and exercised in deployment smoke tests.

use std::collections::BTreeMap;

use altalune_auth::crypto::password::{Argon2Config, PasswordService};
use altalune_auth::crypto::token_service::TokenService;
use altalune_auth::crypto::{pkce, JwtKeys};
use altalune_auth::{
    AuthorizationCode, OAuthClient, ProjectRole, RefreshToken, SessionData, SessionStore, User,
    UserConsent, ROOT_PERMISSION,
};

fn password_service() -> PasswordService {
    PasswordService::new(Argon2Config::testing())
}

fn token_service() -> TokenService {
    let (private_pem, public_pem) = JwtKeys::generate_pem_pair().unwrap();
    let keys = JwtKeys::from_pem(&private_pem, &public_pem, "altalune-1").unwrap();
    TokenService::new(keys, "altalune-oauth", 3600)
}

mod secret_hashing_tests {
    use super::*;

    #[test]
    fn test_verify_accepts_only_the_hashed_secret() {
        let service = password_service();
        let secret = "Sdv3mJqGk8PzR2xWnYfA5cE9uHbT1oLd";
        let hash = service.hash(secret).unwrap();

        assert!(service.verify(secret, &hash).unwrap());
        assert!(!service
            .verify("Sdv3mJqGk8PzR2xWnYfA5cE9uHbT1oLX", &hash)
            .unwrap());
    }

    #[test]
    fn test_phc_format_is_self_describing() {
        let service = password_service();
        let hash = service
            .hash("Sdv3mJqGk8PzR2xWnYfA5cE9uHbT1oLd")
            .unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m="));
        assert!(hash.contains("t="));
        assert!(hash.contains("p="));
    }
}

mod pkce_tests {
    use super::*;
    use altalune_auth::crypto::pkce::CodeChallengeMethod;

    #[test]
    fn test_s256_binding() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = pkce::s256_challenge(verifier);
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");

        assert!(pkce::verify(verifier, &challenge, CodeChallengeMethod::S256));
        assert!(!pkce::verify("x", &challenge, CodeChallengeMethod::S256));
    }
}

mod client_invariant_tests {
    use super::*;

    #[test]
    fn test_public_client_must_require_pkce() {
        let mut client = OAuthClient::new("proj_1", "SPA");
        client.confidential = false;
        client.pkce_required = false;
        assert!(client.validate().is_err());

        client.pkce_required = true;
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_confidential_client_must_have_secret_hash() {
        let mut client = OAuthClient::new("proj_1", "Backend");
        client.confidential = true;
        client.client_secret_hash = None;
        assert!(client.validate().is_err());
    }

    #[test]
    fn test_redirect_acceptance_is_exact_string_equality() {
        let client = OAuthClient::new("proj_1", "App").with_redirect_uri("https://x/cb");

        assert!(client.is_redirect_uri_allowed("https://x/cb"));
        assert!(!client.is_redirect_uri_allowed("https://x/cb/"));
        assert!(!client.is_redirect_uri_allowed("https://x/cb?foo=1"));
    }
}

mod single_use_tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_code_is_single_use() {
        let mut code =
            AuthorizationCode::new("client-uuid", "usr_1", "https://app/cb", "openid email", 600);
        assert!(code.is_valid());

        // First exchange wins
        code.exchange_at = Some(Utc::now());
        assert!(!code.is_valid());
        assert!(code.is_consumed());
    }

    #[test]
    fn test_refresh_token_rotation_consumes_the_old_token() {
        let mut old = RefreshToken::new("client-uuid", "usr_1", "openid", 2_592_000);
        assert!(old.is_valid());

        old.exchange_at = Some(Utc::now());
        let new = RefreshToken::new(&old.client_id, &old.user_id, &old.scope, 2_592_000);

        assert!(!old.is_valid());
        assert!(new.is_valid());
        assert_ne!(old.token, new.token);
        assert_eq!(new.scope, old.scope);
    }
}

mod consent_tests {
    use super::*;

    #[test]
    fn test_consent_satisfied_by_scope_subset() {
        let consent = UserConsent::new("usr_1", "client-uuid", "openid profile email");

        assert!(consent.covers("openid email"));
        assert!(!consent.covers("openid offline_access"));
    }

    #[test]
    fn test_revocation_invalidates_consent() {
        let mut consent = UserConsent::new("usr_1", "client-uuid", "openid");
        consent.revoke();
        assert!(!consent.covers("openid"));
    }
}

mod token_claim_tests {
    use super::*;

    #[test]
    fn test_access_token_carries_identity_and_authorization_claims() {
        let service = token_service();
        let mut user = User::new("a@b.com", "A", "B");
        user.id = "usr_abc".to_string();

        let mut memberships = BTreeMap::new();
        memberships.insert("proj_1".to_string(), ProjectRole::User.as_str().to_string());

        let token = service
            .issue_access_token(
                &user,
                "00000000-0000-0000-0000-000000000001",
                "openid email",
                vec!["employee:read".to_string(), "employee:write".to_string()],
                memberships,
            )
            .unwrap();

        let claims = service
            .validate(&token, Some("00000000-0000-0000-0000-000000000001"))
            .unwrap();

        assert_eq!(claims.iss, "altalune-oauth");
        assert_eq!(claims.sub, "usr_abc");
        assert_eq!(
            claims.aud,
            vec!["00000000-0000-0000-0000-000000000001".to_string()]
        );
        assert_eq!(claims.scope, "openid email");
        assert!(!claims.email_verified);
        assert_eq!(claims.perms.len(), 2);
        assert_eq!(claims.memberships.get("proj_1").unwrap(), "user");
    }

    #[test]
    fn test_email_verified_reflects_stored_flag_at_issue_time() {
        let service = token_service();
        let mut user = User::new("a@b.com", "A", "B");

        let before = service
            .issue_access_token(&user, "c", "openid", vec![], BTreeMap::new())
            .unwrap();
        assert!(!service.validate(&before, Some("c")).unwrap().email_verified);

        // Verification, then a refresh-issued token carries the new flag
        user.verify_email();
        let after = service
            .issue_access_token(&user, "c", "openid", vec![], BTreeMap::new())
            .unwrap();
        assert!(service.validate(&after, Some("c")).unwrap().email_verified);
    }

    #[test]
    fn test_jwks_components_published() {
        let service = token_service();
        assert_eq!(service.kid(), "altalune-1");
        assert_eq!(service.rsa_components().e, "AQAB");
    }
}

mod superadmin_tests {
    use super::*;
    use altalune_auth::role::can;

    #[test]
    fn test_root_short_circuits_every_check() {
        let perms = vec![ROOT_PERMISSION.to_string()];
        assert!(can(&perms, "employee:read"));
        assert!(can(&perms, "project:delete"));
        assert!(can(&perms, "anything:at_all"));
    }

    #[test]
    fn test_without_root_only_exact_grants_pass() {
        let perms = vec!["employee:read".to_string()];
        assert!(can(&perms, "employee:read"));
        assert!(!can(&perms, "employee:write"));
    }
}

mod session_tests {
    use super::*;

    #[test]
    fn test_session_survives_round_trip_and_rejects_tampering() {
        let store = SessionStore::new(
            b"0123456789abcdef0123456789abcdef".to_vec(),
            "altalune_auth",
            false,
            86400,
        )
        .unwrap();

        let mut data = SessionData::default();
        data.authenticate("usr_1");
        data.original_url = Some("/oauth/authorize?client_id=abc&scope=openid".to_string());

        let encoded = store.encode(&data).unwrap();
        assert_eq!(store.decode(&encoded).unwrap(), data);

        // Any bit flip in the payload invalidates the cookie
        let mut tampered = encoded.clone();
        tampered.replace_range(0..1, if &encoded[0..1] == "A" { "B" } else { "A" });
        assert!(store.decode(&tampered).is_none());
    }
}

mod otp_tests {
    use altalune_auth::login::otp::{hash_token, OtpToken};

    #[test]
    fn test_only_the_hash_is_stored() {
        let token = OtpToken::new("a@b.com", "123456", 300);
        assert_eq!(
            token.token_hash,
            "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92"
        );
        assert_eq!(token.token_hash, hash_token("123456"));
        // The raw code never appears in the stored row
        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("123456"));
    }
}
