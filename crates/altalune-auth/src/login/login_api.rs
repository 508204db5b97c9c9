//! Federated Login Endpoints
//!
//! - GET  /login             - provider list, plus the email-OTP form
//! - GET  /login/{provider}  - start an upstream flow
//! - GET  /auth/callback     - upstream redirect handler
//! - POST /logout            - destroy the session
//!
//! The callback validates the state stored in the session, exchanges the
//! upstream code for normalized user info, runs find-or-create, and
//! replays the deferred authorize request.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::IntoParams;

use crate::audit::entity::AuditAction;
use crate::audit::service::AuditService;
use crate::client::entity::OAuthClient;
use crate::client::repository::OAuthClientRepository;
use crate::crypto::random;
use crate::provider::entity::ProviderType;
use crate::provider::repository::OAuthProviderRepository;
use crate::provider::service::ProviderService;
use crate::provider::upstream::build_upstream_client;
use crate::session::store::SessionStore;
use crate::shared::html::{escape, page};
use crate::user::registration::RegistrationService;

/// Login API state
#[derive(Clone)]
pub struct LoginState {
    pub providers: Arc<OAuthProviderRepository>,
    pub provider_service: Arc<ProviderService>,
    pub clients: Arc<OAuthClientRepository>,
    pub registration: Arc<RegistrationService>,
    pub sessions: Arc<SessionStore>,
    pub audit: Arc<AuditService>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginPageParams {
    /// OAuth client whose authorize request deferred to login
    pub client_id: Option<String>,
    pub error: Option<String>,
    pub otp_sent: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProviderStartParams {
    /// URL to return to after login
    pub next: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Login page: enabled providers, and the email-OTP form for standalone
/// (no client_id) sign-in.
#[utoipa::path(
    get,
    path = "/login",
    tag = "login",
    params(LoginPageParams),
    responses(
        (status = 200, description = "Login page")
    )
)]
pub async fn login_page(
    State(state): State<LoginState>,
    Query(params): Query<LoginPageParams>,
) -> Response {
    let providers = match state.providers.list_enabled().await {
        Ok(providers) => providers,
        Err(e) => {
            error!(error = %e, "Provider listing failed");
            vec![]
        }
    };

    let mut body = String::from("<h1>Sign in</h1>\n");

    if let Some(error) = &params.error {
        body.push_str(&format!(
            "<p class=\"error\">Sign-in failed: {}</p>\n",
            escape(error)
        ));
    }
    if params.otp_sent.is_some() {
        body.push_str("<p>We sent a sign-in code to your email.</p>\n");
    }

    for provider in &providers {
        let mut href = format!("/login/{}", provider.provider_type);
        if let Some(client_id) = &params.client_id {
            // Keep the deferred authorize request flowing through the
            // provider hop.
            href.push_str(&format!(
                "?next={}",
                urlencoding::encode(&format!(
                    "/oauth/authorize?client_id={}",
                    urlencoding::encode(client_id)
                ))
            ));
        }
        body.push_str(&format!(
            "<a class=\"provider\" href=\"{}\">Continue with {}</a>\n",
            escape(&href),
            escape(provider.provider_type.as_str())
        ));
    }

    if params.client_id.is_none() {
        body.push_str(
            "<hr>\n\
             <form method=\"post\" action=\"/login/email\">\n\
             <label for=\"email\">Email</label>\n\
             <input type=\"email\" id=\"email\" name=\"email\" required>\n\
             <button type=\"submit\">Email me a sign-in code</button>\n\
             </form>\n\
             <form method=\"post\" action=\"/login/otp/verify\">\n\
             <label for=\"otp\">Sign-in code</label>\n\
             <input type=\"text\" id=\"otp\" name=\"otp\" inputmode=\"numeric\" pattern=\"[0-9]{6}\">\n\
             <button type=\"submit\">Verify code</button>\n\
             </form>\n",
        );
    }

    page("Sign in", &body).into_response()
}

/// Start an upstream flow: stash state + return URL in the session and
/// redirect to the provider's authorize URL.
#[utoipa::path(
    get,
    path = "/login/{provider}",
    tag = "login",
    params(
        ("provider" = String, Path, description = "Provider type"),
        ProviderStartParams
    ),
    responses(
        (status = 302, description = "Redirect to the upstream provider"),
        (status = 302, description = "Redirect back to /login with an error")
    )
)]
pub async fn login_start(
    State(state): State<LoginState>,
    Path(provider_name): Path<String>,
    Query(params): Query<ProviderStartParams>,
    jar: CookieJar,
) -> Response {
    let Some(provider_type) = ProviderType::parse(&provider_name) else {
        return Redirect::temporary("/login?error=unknown_provider").into_response();
    };

    let provider = match state.providers.find_enabled_by_type(provider_type).await {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            return Redirect::temporary("/login?error=provider_not_configured").into_response();
        }
        Err(e) => {
            error!(error = %e, "Provider lookup failed");
            return Redirect::temporary("/login?error=server_error").into_response();
        }
    };

    let upstream = match build_upstream_client(&provider, &state.provider_service) {
        Ok(upstream) => upstream,
        Err(e) => {
            error!(error = %e, provider = %provider_type, "Failed to build upstream client");
            return Redirect::temporary("/login?error=provider_not_configured").into_response();
        }
    };

    let oauth_state = random::url_safe_token();

    let mut session = state.sessions.load(&jar);
    session.oauth_state = Some(oauth_state.clone());
    session.provider = Some(provider_type.as_str().to_string());
    if let Some(next) = params.next.filter(|n| n.starts_with('/')) {
        session.original_url = Some(next);
    }

    let jar = match state.sessions.save(jar, &session) {
        Ok(jar) => jar,
        Err(e) => {
            error!(error = %e, "Failed to persist session");
            return Redirect::temporary("/login?error=server_error").into_response();
        }
    };

    info!(provider = %provider_type, "Redirecting to upstream provider");
    (jar, Redirect::temporary(&upstream.authorize_url(&oauth_state))).into_response()
}

/// Upstream redirect handler.
#[utoipa::path(
    get,
    path = "/auth/callback",
    tag = "login",
    params(CallbackParams),
    responses(
        (status = 302, description = "Redirect to the deferred request or /"),
        (status = 302, description = "Redirect back to /login with an error")
    )
)]
pub async fn callback(
    State(state): State<LoginState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    // Upstream error: propagate the code to the login page.
    if let Some(error) = &params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Upstream provider returned an error"
        );
        return Redirect::temporary(&format!("/login?error={}", urlencoding::encode(error)))
            .into_response();
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return Redirect::temporary("/login?error=invalid_callback").into_response();
    };
    let Some(echoed_state) = params.state.as_deref().filter(|s| !s.is_empty()) else {
        return Redirect::temporary("/login?error=invalid_callback").into_response();
    };

    let mut session = state.sessions.load(&jar);

    // The echoed state must match the one minted at /login/{provider}.
    if session.oauth_state.as_deref() != Some(echoed_state) {
        warn!("OAuth state mismatch on callback");
        return Redirect::temporary("/login?error=invalid_state").into_response();
    }

    let provider_type = session
        .provider
        .as_deref()
        .and_then(ProviderType::parse);
    let Some(provider_type) = provider_type else {
        return Redirect::temporary("/login?error=invalid_state").into_response();
    };

    let provider = match state.providers.find_enabled_by_type(provider_type).await {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            return Redirect::temporary("/login?error=provider_not_configured").into_response();
        }
        Err(e) => {
            error!(error = %e, "Provider lookup failed");
            return Redirect::temporary("/login?error=server_error").into_response();
        }
    };

    let upstream = match build_upstream_client(&provider, &state.provider_service) {
        Ok(upstream) => upstream,
        Err(e) => {
            error!(error = %e, "Failed to build upstream client");
            return Redirect::temporary("/login?error=provider_not_configured").into_response();
        }
    };

    let correlation_id = crate::shared::ids::uuid_string();
    let info = match upstream.exchange_code_for_user_info(code).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, correlation_id = %correlation_id, provider = %provider_type, "Upstream code exchange failed");
            return Redirect::temporary("/login?error=token_exchange_failed").into_response();
        }
    };

    // The OAuth client whose authorize request deferred here, if any,
    // decides project membership for a first login.
    let oauth_client = match resolve_context_client(&state, session.original_url.as_deref()).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Context client lookup failed");
            None
        }
    };

    let user = match state
        .registration
        .find_or_create(&info, provider_type, oauth_client.as_ref())
        .await
    {
        Ok(user) => user,
        Err(crate::shared::error::AuthError::Unauthorized { .. }) => {
            return Redirect::temporary("/login?error=account_deactivated").into_response();
        }
        Err(e) => {
            error!(error = %e, correlation_id = %correlation_id, "Registration failed");
            return Redirect::temporary("/login?error=server_error").into_response();
        }
    };

    session.authenticate(&user.id);
    let redirect_url = session
        .original_url
        .take()
        .unwrap_or_else(|| "/".to_string());

    let jar = match state.sessions.save(jar, &session) {
        Ok(jar) => jar,
        Err(e) => {
            error!(error = %e, "Failed to persist session");
            return Redirect::temporary("/login?error=server_error").into_response();
        }
    };

    state
        .audit
        .record_action("User", &user.id, AuditAction::Login, Some(&user.id))
        .await;

    info!(user_id = %user.id, provider = %provider_type, "Federated login successful");
    (jar, Redirect::temporary(&redirect_url)).into_response()
}

/// Destroy the session.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "login",
    responses(
        (status = 302, description = "Redirect to /login")
    )
)]
pub async fn logout(State(state): State<LoginState>, jar: CookieJar) -> Response {
    let session = state.sessions.load(&jar);
    if let Some(user_id) = &session.user_id {
        state
            .audit
            .record_action("User", user_id, AuditAction::Logout, Some(user_id))
            .await;
    }

    let jar = jar.add(state.sessions.clear_cookie());
    (jar, Redirect::to("/login")).into_response()
}

/// Extract the initiating OAuth client from a deferred authorize URL.
async fn resolve_context_client(
    state: &LoginState,
    original_url: Option<&str>,
) -> crate::shared::error::Result<Option<OAuthClient>> {
    let Some(original_url) = original_url else {
        return Ok(None);
    };
    if !original_url.starts_with("/oauth/authorize") {
        return Ok(None);
    }

    // Relative URL; parse against a placeholder base to read the query.
    let parsed = match url::Url::parse(&format!("http://localhost{}", original_url)) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(None),
    };

    let client_id = parsed
        .query_pairs()
        .find(|(k, _)| k == "client_id")
        .map(|(_, v)| v.into_owned());

    match client_id {
        Some(client_id) => state.clients.find_by_client_id(&client_id).await,
        None => Ok(None),
    }
}

/// Create the login router; mount at the root.
pub fn login_router(state: LoginState) -> Router {
    Router::new()
        .route("/login", get(login_page))
        .route("/login/:provider", get(login_start))
        .route("/auth/callback", get(callback))
        .route("/logout", post(logout))
        .with_state(state)
}
