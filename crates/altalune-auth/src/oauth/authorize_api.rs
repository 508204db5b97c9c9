//! OAuth2 Authorization Endpoint
//!
//! GET /oauth/authorize drives the authorization-code flow: session check,
//! parameter validation, PKCE enforcement, consent, code issuance.
//! POST /oauth/authorize receives the consent form.
//!
//! Errors redirect to the client's redirect_uri with `error` and an echoed
//! `state` whenever a validated redirect target exists; otherwise they
//! render an error page and never redirect.

use axum::{
    extract::{OriginalUri, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::audit::entity::AuditAction;
use crate::audit::service::AuditService;
use crate::client::entity::OAuthClient;
use crate::client::repository::OAuthClientRepository;
use crate::client::service::OAuthClientService;
use crate::crypto::pkce::CodeChallengeMethod;
use crate::crypto::random;
use crate::crypto::token_service::TokenService;
use crate::oauth::authorization_code::AuthorizationCode;
use crate::oauth::authorization_code_repository::AuthorizationCodeRepository;
use crate::oauth::consent_repository::UserConsentRepository;
use crate::oauth::refresh_token_repository::RefreshTokenRepository;
use crate::oauth::scope::ScopeRegistry;
use crate::role::claims_service::ClaimsService;
use crate::session::store::SessionStore;
use crate::shared::html::{error_page, escape, page};
use crate::user::repository::UserRepository;

/// Shared state for the authorize and token endpoints.
#[derive(Clone)]
pub struct OAuthState {
    pub clients: Arc<OAuthClientRepository>,
    pub client_service: Arc<OAuthClientService>,
    pub users: Arc<UserRepository>,
    pub codes: Arc<AuthorizationCodeRepository>,
    pub refresh_tokens: Arc<RefreshTokenRepository>,
    pub consents: Arc<UserConsentRepository>,
    pub scopes: Arc<ScopeRegistry>,
    pub claims: Arc<ClaimsService>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionStore>,
    pub audit: Arc<AuditService>,
    pub code_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
}

/// Authorization request parameters
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeRequest {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    /// PKCE code challenge
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (S256 or plain)
    pub code_challenge_method: Option<String>,
    pub prompt: Option<String>,
}

/// Consent form submission (mirrors the authorize query plus the decision)
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsentForm {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub csrf_token: String,
    pub decision: String,
}

/// Parameters validated far enough to have a trustworthy redirect target.
struct ValidatedRequest {
    client: OAuthClient,
    redirect_uri: String,
    scope: String,
    state: Option<String>,
    nonce: Option<String>,
    code_challenge: Option<String>,
    code_challenge_method: Option<CodeChallengeMethod>,
}

/// Authorization endpoint.
#[utoipa::path(
    get,
    path = "/authorize",
    tag = "oauth",
    params(AuthorizeRequest),
    responses(
        (status = 302, description = "Redirect to login, consent, or the client"),
        (status = 400, description = "Invalid request with no safe redirect target")
    )
)]
pub async fn authorize(
    State(state): State<OAuthState>,
    OriginalUri(uri): OriginalUri,
    Query(req): Query<AuthorizeRequest>,
    jar: CookieJar,
) -> Response {
    let mut session = state.sessions.load(&jar);

    // Unauthenticated: defer the whole request and send the browser to
    // login. The stored URL is replayed after the session is established.
    if !session.is_authenticated() {
        session.original_url = Some(uri.to_string());
        let login_url = match &req.client_id {
            Some(client_id) => format!("/login?client_id={}", urlencoding::encode(client_id)),
            None => "/login".to_string(),
        };

        let jar = match state.sessions.save(jar, &session) {
            Ok(jar) => jar,
            Err(e) => {
                error!(error = %e, "Failed to persist session");
                return error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong",
                    "Please try again.",
                );
            }
        };
        return (jar, Redirect::temporary(&login_url)).into_response();
    }

    let validated = match validate_request(&state, &req).await {
        Ok(v) => v,
        Err(response) => return response,
    };

    let user_id = session.user_id.clone().unwrap_or_default();

    // Consent check: an active grant covering the scope set skips the
    // prompt entirely.
    let satisfied = match state
        .consents
        .is_satisfied(&user_id, &validated.client.client_id, &validated.scope)
        .await
    {
        Ok(satisfied) => satisfied,
        Err(e) => {
            error!(error = %e, "Consent lookup failed");
            return error_redirect(&validated.redirect_uri, "server_error", "Internal error", validated.state.as_deref());
        }
    };

    if satisfied {
        return issue_code(&state, &validated, &user_id).await;
    }

    // Render the consent page with a fresh CSRF token bound to the session.
    let csrf_token = random::url_safe_token();
    session.csrf_token = Some(csrf_token.clone());
    let jar = match state.sessions.save(jar, &session) {
        Ok(jar) => jar,
        Err(e) => {
            error!(error = %e, "Failed to persist session");
            return error_redirect(&validated.redirect_uri, "server_error", "Internal error", validated.state.as_deref());
        }
    };

    (jar, consent_page(&state, &req, &validated, &csrf_token)).into_response()
}

/// Consent form endpoint.
#[utoipa::path(
    post,
    path = "/authorize",
    tag = "oauth",
    request_body = ConsentForm,
    responses(
        (status = 302, description = "Redirect to the client with a code or access_denied"),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "CSRF token mismatch")
    )
)]
pub async fn authorize_decision(
    State(state): State<OAuthState>,
    jar: CookieJar,
    Form(form): Form<ConsentForm>,
) -> Response {
    let session = state.sessions.load(&jar);

    let Some(user_id) = session.user_id.clone() else {
        return error_page(
            StatusCode::UNAUTHORIZED,
            "Session expired",
            "Please sign in again.",
        );
    };

    // CSRF: the submitted token must match the one issued with the form.
    let expected = session.csrf_token.as_deref().unwrap_or_default();
    let matches: bool = expected
        .as_bytes()
        .ct_eq(form.csrf_token.as_bytes())
        .into();
    if expected.is_empty() || !matches {
        warn!(user_id = %user_id, "Consent submission with invalid CSRF token");
        return error_page(
            StatusCode::FORBIDDEN,
            "Invalid request",
            "The form has expired. Please retry the authorization.",
        );
    }

    let req = AuthorizeRequest {
        response_type: form.response_type,
        client_id: form.client_id,
        redirect_uri: form.redirect_uri,
        scope: form.scope,
        state: form.state,
        nonce: form.nonce,
        code_challenge: form.code_challenge,
        code_challenge_method: form.code_challenge_method,
        prompt: None,
    };

    let validated = match validate_request(&state, &req).await {
        Ok(v) => v,
        Err(response) => return response,
    };

    match form.decision.as_str() {
        "allow" => {
            if let Err(e) = state
                .consents
                .upsert_grant(&user_id, &validated.client.client_id, &validated.scope)
                .await
            {
                error!(error = %e, "Failed to record consent");
                return error_redirect(&validated.redirect_uri, "server_error", "Internal error", validated.state.as_deref());
            }

            state
                .audit
                .record_action(
                    "UserConsent",
                    &validated.client.client_id,
                    AuditAction::ConsentGranted,
                    Some(&user_id),
                )
                .await;

            issue_code(&state, &validated, &user_id).await
        }
        "deny" => {
            state
                .audit
                .record_action(
                    "UserConsent",
                    &validated.client.client_id,
                    AuditAction::ConsentDenied,
                    Some(&user_id),
                )
                .await;

            error_redirect(
                &validated.redirect_uri,
                "access_denied",
                "The user denied the request",
                validated.state.as_deref(),
            )
        }
        _ => error_redirect(
            &validated.redirect_uri,
            "invalid_request",
            "Invalid decision",
            validated.state.as_deref(),
        ),
    }
}

/// Validate authorize parameters.
///
/// Failures before the redirect URI is proven registered render an error
/// page; afterwards they redirect with an OAuth error code.
async fn validate_request(
    state: &OAuthState,
    req: &AuthorizeRequest,
) -> std::result::Result<ValidatedRequest, Response> {
    let Some(client_id) = req.client_id.as_deref().filter(|s| !s.is_empty()) else {
        return Err(error_page(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "Missing client_id parameter.",
        ));
    };

    let Some(redirect_uri) = req.redirect_uri.as_deref().filter(|s| !s.is_empty()) else {
        return Err(error_page(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            "Missing redirect_uri parameter.",
        ));
    };

    // Unknown client: render, never redirect to an unverified URI.
    let client = match state.clients.find_by_client_id(client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => {
            return Err(error_page(
                StatusCode::BAD_REQUEST,
                "Unknown client",
                "The client_id is not registered.",
            ));
        }
        Err(e) => {
            error!(error = %e, "Client lookup failed");
            return Err(error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "Please try again.",
            ));
        }
    };

    // Exact-match redirect validation gates every redirecting error path.
    if !client.is_redirect_uri_allowed(redirect_uri) {
        return Err(error_page(
            StatusCode::BAD_REQUEST,
            "Invalid redirect URI",
            "The redirect_uri is not registered for this client.",
        ));
    }

    let state_param = req.state.as_deref();

    if req.response_type.as_deref() != Some("code") {
        return Err(error_redirect(
            redirect_uri,
            "unsupported_response_type",
            "Only 'code' response type is supported",
            state_param,
        ));
    }

    // PKCE enforcement
    if client.pkce_required && req.code_challenge.is_none() {
        return Err(error_redirect(
            redirect_uri,
            "invalid_request",
            "PKCE code_challenge is required",
            state_param,
        ));
    }

    let code_challenge_method = match (&req.code_challenge, &req.code_challenge_method) {
        (Some(_), Some(method)) => match CodeChallengeMethod::parse(method) {
            Some(method) => Some(method),
            None => {
                return Err(error_redirect(
                    redirect_uri,
                    "invalid_request",
                    "Invalid code_challenge_method",
                    state_param,
                ));
            }
        },
        // A challenge without a method defaults to S256
        (Some(_), None) => Some(CodeChallengeMethod::S256),
        (None, _) => None,
    };

    // Scope validation
    let scope = req.scope.clone().unwrap_or_default();
    if let Err(unknown) = state.scopes.validate(&scope) {
        return Err(error_redirect(
            redirect_uri,
            "invalid_scope",
            &format!("Unknown scope '{}'", unknown),
            state_param,
        ));
    }
    if !client.allowed_scopes.is_empty() {
        for s in scope.split_whitespace() {
            if !client.allowed_scopes.iter().any(|allowed| allowed == s) {
                return Err(error_redirect(
                    redirect_uri,
                    "invalid_scope",
                    &format!("Scope '{}' is not allowed for this client", s),
                    state_param,
                ));
            }
        }
    }

    Ok(ValidatedRequest {
        client,
        redirect_uri: redirect_uri.to_string(),
        scope,
        state: req.state.clone(),
        nonce: req.nonce.clone(),
        code_challenge: req.code_challenge.clone(),
        code_challenge_method,
    })
}

/// Persist an authorization code and redirect back to the client.
async fn issue_code(state: &OAuthState, validated: &ValidatedRequest, user_id: &str) -> Response {
    let mut code = AuthorizationCode::new(
        &validated.client.client_id,
        user_id,
        &validated.redirect_uri,
        &validated.scope,
        state.code_expiry_secs,
    )
    .with_nonce(validated.nonce.clone());

    if let (Some(challenge), Some(method)) =
        (&validated.code_challenge, validated.code_challenge_method)
    {
        code = code.with_pkce(challenge.clone(), method);
    }

    if let Err(e) = state.codes.insert(&code).await {
        error!(error = %e, "Failed to store authorization code");
        return error_redirect(
            &validated.redirect_uri,
            "server_error",
            "Failed to create authorization code",
            validated.state.as_deref(),
        );
    }

    info!(
        client_id = %validated.client.client_id,
        user_id = %user_id,
        "Authorization code issued"
    );

    let mut url = format!(
        "{}?code={}",
        validated.redirect_uri,
        urlencoding::encode(&code.code)
    );
    if let Some(s) = &validated.state {
        url.push_str(&format!("&state={}", urlencoding::encode(s)));
    }

    Redirect::to(&url).into_response()
}

/// Render the consent prompt with all authorize parameters as hidden fields.
fn consent_page(
    state: &OAuthState,
    req: &AuthorizeRequest,
    validated: &ValidatedRequest,
    csrf_token: &str,
) -> Response {
    let mut hidden = String::new();
    let fields = [
        ("response_type", req.response_type.as_deref()),
        ("client_id", req.client_id.as_deref()),
        ("redirect_uri", req.redirect_uri.as_deref()),
        ("scope", req.scope.as_deref()),
        ("state", req.state.as_deref()),
        ("nonce", req.nonce.as_deref()),
        ("code_challenge", req.code_challenge.as_deref()),
        ("code_challenge_method", req.code_challenge_method.as_deref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            hidden.push_str(&format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                name,
                escape(value)
            ));
        }
    }

    let mut scope_items = String::new();
    for s in validated.scope.split_whitespace() {
        let description = state
            .scopes
            .get(s)
            .map(|d| d.description.clone())
            .unwrap_or_else(|| s.to_string());
        scope_items.push_str(&format!("<li>{}</li>\n", escape(&description)));
    }
    if scope_items.is_empty() {
        scope_items.push_str("<li>Confirm your identity</li>\n");
    }

    let body = format!(
        "<h1>Authorize {}</h1>\n\
         <p><strong>{}</strong> wants to:</p>\n\
         <ul class=\"scopes\">{}</ul>\n\
         <form method=\"post\" action=\"/oauth/authorize\">\n\
         {}\
         <input type=\"hidden\" name=\"csrf_token\" value=\"{}\">\n\
         <button type=\"submit\" name=\"decision\" value=\"allow\">Allow</button>\n\
         <button type=\"submit\" name=\"decision\" value=\"deny\">Deny</button>\n\
         </form>",
        escape(&validated.client.name),
        escape(&validated.client.name),
        scope_items,
        hidden,
        escape(csrf_token),
    );

    page("Authorize access", &body).into_response()
}

/// Redirect back to the client with an OAuth error and the echoed state.
pub(crate) fn error_redirect(
    redirect_uri: &str,
    error: &str,
    description: &str,
    state: Option<&str>,
) -> Response {
    let mut url = format!(
        "{}?error={}&error_description={}",
        redirect_uri,
        urlencoding::encode(error),
        urlencoding::encode(description),
    );
    if let Some(s) = state {
        url.push_str(&format!("&state={}", urlencoding::encode(s)));
    }
    Redirect::to(&url).into_response()
}

/// Create the OAuth router (authorize + token endpoints).
pub fn oauth_router(state: OAuthState) -> Router {
    Router::new()
        .route("/authorize", get(authorize).post(authorize_decision))
        .route("/token", axum::routing::post(crate::oauth::token_api::token))
        .with_state(state)
}
