//! Well-Known Endpoints
//!
//! Standard .well-known endpoints for OAuth 2.0 / OpenID Connect discovery.
//! - /.well-known/openid-configuration
//! - /.well-known/jwks.json

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::crypto::token_service::TokenService;

/// OpenID Connect Discovery Document
#[derive(Debug, Serialize, ToSchema)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}

/// JSON Web Key Set (JWKS)
#[derive(Debug, Serialize, ToSchema)]
pub struct JwksResponse {
    pub keys: Vec<JwkKey>,
}

/// Individual JSON Web Key
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JwkKey {
    /// Key type
    pub kty: String,

    /// Key use (sig for signature)
    #[serde(rename = "use")]
    pub key_use: String,

    /// Key ID
    pub kid: String,

    /// Algorithm
    pub alg: String,

    /// RSA modulus, base64url
    pub n: String,

    /// RSA exponent, base64url ("AQAB" for 65537)
    pub e: String,
}

#[derive(Clone)]
pub struct WellKnownState {
    pub tokens: Arc<TokenService>,
    pub external_base: String,
    pub issuer: String,
}

/// OpenID Connect discovery document.
#[utoipa::path(
    get,
    path = "/openid-configuration",
    tag = "well-known",
    responses(
        (status = 200, description = "OpenID configuration", body = OpenIdConfiguration)
    )
)]
pub async fn get_openid_configuration(
    State(state): State<WellKnownState>,
) -> Json<OpenIdConfiguration> {
    let base_url = &state.external_base;

    Json(OpenIdConfiguration {
        issuer: state.issuer.clone(),
        authorization_endpoint: format!("{}/oauth/authorize", base_url),
        token_endpoint: format!("{}/oauth/token", base_url),
        jwks_uri: format!("{}/.well-known/jwks.json", base_url),
        response_types_supported: vec!["code".to_string()],
        subject_types_supported: vec!["public".to_string()],
        id_token_signing_alg_values_supported: vec!["RS256".to_string()],
        scopes_supported: vec![
            "openid".to_string(),
            "profile".to_string(),
            "email".to_string(),
            "offline_access".to_string(),
        ],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_basic".to_string(),
            "client_secret_post".to_string(),
        ],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        code_challenge_methods_supported: vec!["S256".to_string(), "plain".to_string()],
    })
}

/// Published signing keys. Clients should cache and refresh periodically.
#[utoipa::path(
    get,
    path = "/jwks.json",
    tag = "well-known",
    responses(
        (status = 200, description = "JWKS", body = JwksResponse)
    )
)]
pub async fn get_jwks(State(state): State<WellKnownState>) -> Json<JwksResponse> {
    let components = state.tokens.rsa_components();

    Json(JwksResponse {
        keys: vec![JwkKey {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            kid: state.tokens.kid().to_string(),
            alg: "RS256".to_string(),
            n: components.n.clone(),
            e: components.e.clone(),
        }],
    })
}

/// Create the well-known router; mount at `/.well-known`.
pub fn well_known_router(state: WellKnownState) -> Router {
    Router::new()
        .route("/openid-configuration", get(get_openid_configuration))
        .route("/jwks.json", get(get_jwks))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_serialization() {
        let jwks = JwksResponse {
            keys: vec![JwkKey {
                kty: "RSA".to_string(),
                key_use: "sig".to_string(),
                kid: "altalune-1".to_string(),
                alg: "RS256".to_string(),
                n: "modulus".to_string(),
                e: "AQAB".to_string(),
            }],
        };

        let json = serde_json::to_string(&jwks).unwrap();
        assert!(json.contains("\"keys\""));
        assert!(json.contains("\"kty\":\"RSA\""));
        assert!(json.contains("\"use\":\"sig\""));
        assert!(json.contains("\"kid\":\"altalune-1\""));
        assert!(json.contains("\"e\":\"AQAB\""));
    }
}
