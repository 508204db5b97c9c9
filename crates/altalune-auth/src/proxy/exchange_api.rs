//! Token-Exchange Proxy
//!
//! POST /api/auth/exchange. Public SPA clients finish the code→token
//! exchange here: the proxy appends the dashboard client's confidential
//! credentials and forwards the authorization server's response —
//! including upstream error bodies — with shape preserved.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::error;
use utoipa::ToSchema;

use crate::shared::error::oauth_error;

/// Exchange proxy state
#[derive(Clone)]
pub struct ExchangeState {
    pub http: reqwest::Client,
    /// Authorization server base URL (token endpoint is {base}/oauth/token)
    pub auth_server_url: String,
    /// Dashboard client credentials, never exposed to the SPA
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExchangeRequest {
    pub code: String,
    pub code_verifier: Option<String>,
    pub redirect_uri: String,
}

/// Complete a code→token exchange on behalf of the SPA.
#[utoipa::path(
    post,
    path = "/api/auth/exchange",
    tag = "proxy",
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Token response forwarded from the authorization server"),
        (status = 400, description = "Error response forwarded from the authorization server"),
        (status = 502, description = "Authorization server unreachable")
    )
)]
pub async fn exchange(
    State(state): State<ExchangeState>,
    Json(req): Json<ExchangeRequest>,
) -> Response {
    let mut params = vec![
        ("grant_type", "authorization_code".to_string()),
        ("code", req.code),
        ("redirect_uri", req.redirect_uri),
        ("client_id", state.client_id.clone()),
        ("client_secret", state.client_secret.clone()),
    ];
    if let Some(verifier) = req.code_verifier {
        params.push(("code_verifier", verifier));
    }

    let token_url = format!("{}/oauth/token", state.auth_server_url.trim_end_matches('/'));

    let response = match state
        .http
        .post(&token_url)
        .form(&params)
        .timeout(Duration::from_secs(30))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Token exchange request failed");
            return oauth_error(
                StatusCode::BAD_GATEWAY,
                "server_error",
                "Authorization server unreachable",
            );
        }
    };

    // Forward status and body verbatim so error shapes survive.
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to read token response");
            return oauth_error(
                StatusCode::BAD_GATEWAY,
                "server_error",
                "Invalid response from authorization server",
            );
        }
    };

    (
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response()
}

/// Create the exchange proxy router; mount at the root.
pub fn exchange_router(state: ExchangeState) -> Router {
    Router::new()
        .route("/api/auth/exchange", post(exchange))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(server_uri: &str) -> ExchangeState {
        ExchangeState {
            http: reqwest::Client::new(),
            auth_server_url: server_uri.to_string(),
            client_id: "dashboard-client".to_string(),
            client_secret: "dashboard-secret-dashboard-secret".to_string(),
        }
    }

    async fn send(
        app: Router,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/auth/exchange")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_appends_credentials_and_forwards_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("client_id=dashboard-client"))
            .and(body_string_contains("client_secret="))
            .and(body_string_contains("code_verifier=verifier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "uuid",
                "scope": "openid email"
            })))
            .mount(&server)
            .await;

        let app = exchange_router(state(&server.uri()));
        let (status, json) = send(
            app,
            serde_json::json!({
                "code": "code-uuid",
                "code_verifier": "verifier",
                "redirect_uri": "https://app/cb"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["access_token"], "jwt");
    }

    #[tokio::test]
    async fn test_forwards_error_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid or expired authorization code"
            })))
            .mount(&server)
            .await;

        let app = exchange_router(state(&server.uri()));
        let (status, json) = send(
            app,
            serde_json::json!({
                "code": "stale-code",
                "redirect_uri": "https://app/cb"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_grant");
    }
}
