//! OAuth2 Token Endpoint
//!
//! POST /oauth/token. Client authentication via HTTP Basic or request-body
//! credentials; authorization_code and refresh_token grants; refresh
//! rotation with single-use enforcement.
//!
//! Authentication failures never reveal whether the client_id or the
//! secret was wrong.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::audit::entity::AuditAction;
use crate::client::entity::OAuthClient;
use crate::crypto::pkce::{self, CodeChallengeMethod};
use crate::oauth::authorize_api::OAuthState;
use crate::oauth::refresh_token::RefreshToken;
use crate::shared::error::{oauth_error, OAuthErrorBody};
use crate::user::entity::User;

/// Token request (form-urlencoded)
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// PKCE code verifier
    pub code_verifier: Option<String>,
    /// For refresh token grant
    pub refresh_token: Option<String>,
}

/// Token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Token endpoint.
#[utoipa::path(
    post,
    path = "/token",
    tag = "oauth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant", body = OAuthErrorBody),
        (status = 401, description = "Invalid client", body = OAuthErrorBody)
    )
)]
pub async fn token(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    Form(req): Form<TokenRequest>,
) -> Response {
    let client = match authenticate_client(&state, &headers, &req).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    match req.grant_type.as_str() {
        "authorization_code" => handle_authorization_code_grant(state, client, req).await,
        "refresh_token" => handle_refresh_token_grant(state, client, req).await,
        other => oauth_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            &format!("Grant type '{}' is not supported", other),
        ),
    }
}

/// Resolve and authenticate the requesting client.
///
/// Confidential clients must present their secret (Basic or body) and it
/// is verified against the Argon2id hash. Public clients send no secret;
/// their proof is PKCE, checked per-grant.
async fn authenticate_client(
    state: &OAuthState,
    headers: &HeaderMap,
    req: &TokenRequest,
) -> std::result::Result<OAuthClient, Response> {
    let basic = parse_basic_auth(headers);

    let (client_id, client_secret) = match &basic {
        Some((id, secret)) => (Some(id.as_str()), Some(secret.as_str())),
        None => (req.client_id.as_deref(), req.client_secret.as_deref()),
    };

    let Some(client_id) = client_id.filter(|s| !s.is_empty()) else {
        return Err(invalid_client());
    };

    let client = match state.clients.find_by_client_id(client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return Err(invalid_client()),
        Err(e) => {
            error!(error = %e, "Client lookup failed");
            return Err(server_error());
        }
    };

    if client.confidential {
        let Some(secret) = client_secret.filter(|s| !s.is_empty()) else {
            return Err(invalid_client());
        };
        match state.client_service.authenticate(client_id, secret).await {
            Ok(client) => Ok(client),
            Err(crate::shared::error::AuthError::InvalidCredentials) => Err(invalid_client()),
            Err(e) => {
                error!(error = %e, "Client secret verification failed");
                Err(server_error())
            }
        }
    } else {
        Ok(client)
    }
}

async fn handle_authorization_code_grant(
    state: OAuthState,
    client: OAuthClient,
    req: TokenRequest,
) -> Response {
    let Some(code_value) = req.code.as_deref().filter(|s| !s.is_empty()) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing 'code' parameter",
        );
    };
    let Some(redirect_uri) = req.redirect_uri.as_deref().filter(|s| !s.is_empty()) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing 'redirect_uri' parameter",
        );
    };

    // Atomic single-use consumption: only one caller wins a code.
    let code = match state.codes.consume(code_value).await {
        Ok(Some(code)) => code,
        Ok(None) => {
            // A row that exists but could not be consumed is a replay or
            // an expired code; replays are logged for out-of-band review.
            if let Ok(Some(existing)) = state.codes.find_by_code(code_value).await {
                if existing.is_consumed() {
                    warn!(client_id = %client.client_id, "Authorization code replay detected");
                    state
                        .audit
                        .record_action(
                            "AuthorizationCode",
                            code_value,
                            AuditAction::CodeReplayed,
                            None,
                        )
                        .await;
                }
            }
            return invalid_grant("Invalid or expired authorization code");
        }
        Err(e) => {
            error!(error = %e, "Authorization code lookup failed");
            return server_error();
        }
    };

    // Binding checks: issuing client and exact redirect match.
    if code.client_id != client.client_id {
        return invalid_grant("Authorization code was issued to a different client");
    }
    if code.redirect_uri != redirect_uri {
        return invalid_grant("Redirect URI mismatch");
    }

    // PKCE: a code issued with a challenge demands a matching verifier.
    if let Some(challenge) = &code.code_challenge {
        let Some(verifier) = req.code_verifier.as_deref().filter(|s| !s.is_empty()) else {
            return invalid_grant("Missing code_verifier");
        };
        let method = code
            .code_challenge_method
            .unwrap_or(CodeChallengeMethod::S256);
        if !pkce::verify(verifier, challenge, method) {
            return invalid_grant("Invalid code_verifier");
        }
    }

    let user = match load_active_user(&state, &code.user_id).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let refresh = RefreshToken::new(
        &client.client_id,
        &user.id,
        &code.scope,
        state.refresh_token_expiry_secs,
    )
    .with_nonce(code.nonce.clone());

    respond_with_tokens(&state, &client, &user, &code.scope, refresh).await
}

async fn handle_refresh_token_grant(
    state: OAuthState,
    client: OAuthClient,
    req: TokenRequest,
) -> Response {
    let Some(token_value) = req.refresh_token.as_deref().filter(|s| !s.is_empty()) else {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing 'refresh_token' parameter",
        );
    };

    // Single-use rotation: consuming the token here means a replayed token
    // never reaches issuance.
    let old_token = match state.refresh_tokens.consume(token_value).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            if let Ok(Some(existing)) = state.refresh_tokens.find_by_token(token_value).await {
                if existing.is_consumed() {
                    warn!(client_id = %client.client_id, "Refresh token replay detected");
                    state
                        .audit
                        .record_action(
                            "RefreshToken",
                            token_value,
                            AuditAction::RefreshTokenReplayed,
                            None,
                        )
                        .await;
                }
            }
            return invalid_grant("Invalid or expired refresh token");
        }
        Err(e) => {
            error!(error = %e, "Refresh token lookup failed");
            return server_error();
        }
    };

    if old_token.client_id != client.client_id {
        return invalid_grant("Refresh token was issued to a different client");
    }

    let user = match load_active_user(&state, &old_token.user_id).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let new_refresh = RefreshToken::new(
        &client.client_id,
        &user.id,
        &old_token.scope,
        state.refresh_token_expiry_secs,
    )
    .with_nonce(old_token.nonce.clone());

    respond_with_tokens(&state, &client, &user, &old_token.scope, new_refresh).await
}

async fn load_active_user(
    state: &OAuthState,
    user_id: &str,
) -> std::result::Result<User, Response> {
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) if user.is_active => Ok(user),
        Ok(Some(_)) => Err(invalid_grant("Account is not active")),
        Ok(None) => Err(invalid_grant("Unknown user")),
        Err(e) => {
            error!(error = %e, "User lookup failed");
            Err(server_error())
        }
    }
}

/// Materialize claims, mint the access token, store the refresh token,
/// and build the token response.
async fn respond_with_tokens(
    state: &OAuthState,
    client: &OAuthClient,
    user: &User,
    scope: &str,
    refresh: RefreshToken,
) -> Response {
    let claims = match state.claims.resolve(user).await {
        Ok(claims) => claims,
        Err(e) => {
            error!(error = %e, "Claims resolution failed");
            return server_error();
        }
    };

    let access_token = match state.tokens.issue_access_token(
        user,
        &client.client_id,
        scope,
        claims.perms,
        claims.memberships,
    ) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to generate access token");
            return server_error();
        }
    };

    if let Err(e) = state.refresh_tokens.insert(&refresh).await {
        error!(error = %e, "Failed to store refresh token");
        return server_error();
    }

    info!(
        user_id = %user.id,
        client_id = %client.client_id,
        "Tokens issued"
    );

    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.tokens.access_token_expiry_secs(),
            refresh_token: Some(refresh.token),
            scope: Some(scope.to_string()),
        }),
    )
        .into_response()
}

/// Parse HTTP Basic credentials into (client_id, client_secret).
fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

fn invalid_client() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"oauth\"")],
        Json(OAuthErrorBody::new(
            "invalid_client",
            "Client authentication failed",
        )),
    )
        .into_response()
}

fn invalid_grant(description: &str) -> Response {
    oauth_error(StatusCode::BAD_REQUEST, "invalid_grant", description)
}

fn server_error() -> Response {
    oauth_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "server_error",
        "Internal error",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_auth() {
        let mut headers = HeaderMap::new();
        // base64("client-id:secret")
        headers.insert(
            header::AUTHORIZATION,
            "Basic Y2xpZW50LWlkOnNlY3JldA==".parse().unwrap(),
        );

        let (id, secret) = parse_basic_auth(&headers).unwrap();
        assert_eq!(id, "client-id");
        assert_eq!(secret, "secret");
    }

    #[test]
    fn test_parse_basic_auth_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer token".parse().unwrap());
        assert!(parse_basic_auth(&headers).is_none());
    }

    #[test]
    fn test_parse_basic_auth_missing() {
        assert!(parse_basic_auth(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_token_response_shape() {
        let response = TokenResponse {
            access_token: "jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: Some("uuid".to_string()),
            scope: Some("openid email".to_string()),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"token_type\":\"Bearer\""));
        assert!(json.contains("\"expires_in\":3600"));
        assert!(json.contains("\"refresh_token\":\"uuid\""));
    }
}
