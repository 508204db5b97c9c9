//! OTP Login and Email Verification Endpoints
//!
//! - POST /login/email      - request a one-time sign-in code
//! - POST /login/otp/verify - redeem the code and authenticate the session
//! - GET  /verify-email     - consume an email-verification token
//!
//! OTP requests are rate limited per email: the row count inside the
//! window is the hard limit.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::audit::entity::AuditAction;
use crate::audit::service::AuditService;
use crate::email::sender::EmailService;
use crate::login::otp::{hash_token, OtpToken};
use crate::login::otp_repository::OtpTokenRepository;
use crate::login::verification_repository::VerificationTokenRepository;
use crate::session::store::SessionStore;
use crate::shared::error::oauth_error;
use crate::shared::html::{error_page, page};
use crate::user::repository::UserRepository;

/// OTP API state
#[derive(Clone)]
pub struct OtpState {
    pub users: Arc<UserRepository>,
    pub otps: Arc<OtpTokenRepository>,
    pub verifications: Arc<VerificationTokenRepository>,
    pub email: Arc<EmailService>,
    pub sessions: Arc<SessionStore>,
    pub audit: Arc<AuditService>,
    pub otp_expiry_secs: i64,
    pub otp_rate_limit: u64,
    pub otp_rate_limit_window_secs: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailLoginForm {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OtpVerifyForm {
    pub otp: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyEmailParams {
    pub token: String,
}

/// Request a one-time sign-in code.
#[utoipa::path(
    post,
    path = "/login/email",
    tag = "login",
    request_body(content = EmailLoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Code dispatched; redirect to the OTP form"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn request_otp(
    State(state): State<OtpState>,
    Form(form): Form<EmailLoginForm>,
) -> Response {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "A valid email address is required",
        );
    }

    // Hard limit: rows issued for this email inside the window.
    let recent = match state
        .otps
        .count_recent(&email, state.otp_rate_limit_window_secs)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "OTP rate limit check failed");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }
    };
    if recent >= state.otp_rate_limit {
        warn!(email = %email, "OTP rate limit reached");
        state
            .audit
            .record_action("OtpToken", &email, AuditAction::OtpRateLimited, None)
            .await;
        return oauth_error(
            StatusCode::TOO_MANY_REQUESTS,
            "too_many_requests",
            "Too many codes requested; try again later",
        );
    }

    // Only active users receive a code. The response does not reveal
    // whether the account exists.
    let user = match state.users.find_by_email(&email).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "User lookup failed");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }
    };

    if let Some(user) = user.filter(|u| u.is_active) {
        let otp = crate::crypto::random::otp();
        let token = OtpToken::new(&email, &otp, state.otp_expiry_secs);

        if let Err(e) = state.otps.insert(&token).await {
            error!(error = %e, "Failed to store OTP");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }

        let expiry_minutes = (state.otp_expiry_secs / 60).max(1);
        if let Err(e) = state.email.send_otp(&email, &otp, expiry_minutes).await {
            error!(error = %e, user_id = %user.id, "Failed to send OTP email");
            return oauth_error(
                StatusCode::BAD_GATEWAY,
                "server_error",
                "Failed to send the sign-in code",
            );
        }

        info!(user_id = %user.id, "OTP dispatched");
    }

    Redirect::to(&format!(
        "/login?otp_sent=1&email={}",
        urlencoding::encode(&email)
    ))
    .into_response()
}

/// Redeem a sign-in code and authenticate the session.
#[utoipa::path(
    post,
    path = "/login/otp/verify",
    tag = "login",
    request_body(content = OtpVerifyForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Session authenticated; redirect to the deferred request"),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify_otp(
    State(state): State<OtpState>,
    jar: CookieJar,
    Form(form): Form<OtpVerifyForm>,
) -> Response {
    let candidate = form.otp.trim();
    if candidate.is_empty() {
        return oauth_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing 'otp' field",
        );
    }

    // Single use: redeeming marks the row used atomically.
    let token = match state.otps.consume_by_hash(&hash_token(candidate)).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            return oauth_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Invalid or expired code",
            );
        }
        Err(e) => {
            error!(error = %e, "OTP lookup failed");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }
    };

    let user = match state.users.find_by_email(&token.email).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            return oauth_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Invalid or expired code",
            );
        }
        Err(e) => {
            error!(error = %e, "User lookup failed");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }
    };

    let mut session = state.sessions.load(&jar);
    session.authenticate(&user.id);
    let redirect_url = session
        .original_url
        .take()
        .unwrap_or_else(|| "/".to_string());

    let jar = match state.sessions.save(jar, &session) {
        Ok(jar) => jar,
        Err(e) => {
            error!(error = %e, "Failed to persist session");
            return oauth_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Internal error",
            );
        }
    };

    state
        .audit
        .record_action("User", &user.id, AuditAction::Login, Some(&user.id))
        .await;

    info!(user_id = %user.id, "OTP login successful");
    (jar, Redirect::to(&redirect_url)).into_response()
}

/// Consume an email-verification token.
#[utoipa::path(
    get,
    path = "/verify-email",
    tag = "login",
    params(VerifyEmailParams),
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Invalid or expired link")
    )
)]
pub async fn verify_email(
    State(state): State<OtpState>,
    Query(params): Query<VerifyEmailParams>,
) -> Response {
    let token = match state
        .verifications
        .consume_by_hash(&hash_token(params.token.trim()))
        .await
    {
        Ok(Some(token)) => token,
        Ok(None) => {
            return error_page(
                StatusCode::BAD_REQUEST,
                "Link invalid",
                "This verification link is invalid or has expired.",
            );
        }
        Err(e) => {
            error!(error = %e, "Verification token lookup failed");
            return error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "Please try again.",
            );
        }
    };

    if let Err(e) = state.users.mark_email_verified(&token.user_id).await {
        error!(error = %e, user_id = %token.user_id, "Failed to mark email verified");
        return error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            "Please try again.",
        );
    }

    info!(user_id = %token.user_id, "Email verified");
    page(
        "Email verified",
        "<h1>Email verified</h1>\n<p>You can close this window and sign in.</p>",
    )
    .into_response()
}

/// Create the OTP/verification router; mount at the root.
pub fn otp_router(state: OtpState) -> Router {
    Router::new()
        .route("/login/email", post(request_otp))
        .route("/login/otp/verify", post(verify_otp))
        .route("/verify-email", get(verify_email))
        .with_state(state)
}
