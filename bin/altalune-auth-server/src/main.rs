//! Altalune Authorization Server
//!
//! Serves the OAuth 2.1 endpoints, federated login, OTP login, email
//! verification, JWKS, and health probes.
//!
//! ## Configuration
//!
//! Loaded from `altalune.toml` (see `altalune-config` for the search
//! paths) with `ALTALUNE_*` environment overrides. Missing session or JWT
//! key material is fatal at startup.
//!
//! ## Subcommands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` (default) | Run the authorization server |
//! | `hash <secret>`   | Print an Argon2id hash for bootstrap/migration |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use altalune_auth::api::{
    health_router, login_router, oauth_router, otp_router, well_known_router, HealthState,
    LoginState, OAuthState, OtpState, WellKnownState,
};
use altalune_auth::crypto::password::MIN_SECRET_LENGTH;
use altalune_auth::{
    AuditLogRepository, AuditService, AuthorizationCodeRepository, ClaimsService, EmailService,
    OAuthClientRepository, OAuthClientService, OAuthProviderRepository, OtpTokenRepository,
    PasswordService, ProjectMemberRepository, ProviderService, RefreshTokenRepository,
    RegistrationService, RoleRepository, SecretBox, SessionStore, TokenService,
    UserConsentRepository, UserIdentityRepository, UserRepository, VerificationTokenRepository,
};
use altalune_config::ConfigLoader;

#[derive(Parser)]
#[command(name = "altalune-auth-server", about = "Altalune authorization server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the authorization server
    Serve,
    /// Hash a secret with Argon2id for bootstrap or manual migration
    Hash {
        /// The secret to hash (at least 32 characters)
        secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Hash { secret } => hash_secret(&secret),
        Command::Serve => serve(cli.config.as_deref()).await,
    }
}

fn hash_secret(secret: &str) -> Result<()> {
    if secret.len() < MIN_SECRET_LENGTH {
        bail!("Secret must be at least {} characters", MIN_SECRET_LENGTH);
    }

    let passwords = PasswordService::default();
    let hash = passwords
        .hash(secret)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    println!("{}", hash);
    Ok(())
}

async fn serve(config_path: Option<&str>) -> Result<()> {
    altalune_common::logging::init_logging("altalune-auth-server");

    info!("Starting Altalune authorization server");

    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("Failed to load configuration")?;
    config
        .validate_auth_server()
        .context("Invalid configuration")?;

    // Connect to MongoDB
    info!(
        uri = %config.mongodb.uri,
        database = %config.mongodb.database,
        "Connecting to MongoDB"
    );
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    altalune_auth::shared::indexes::initialize_indexes(&db)
        .await
        .context("Index initialization failed")?;

    // Crypto material: any failure here is fatal.
    let keys = altalune_auth::crypto::JwtKeys::from_pem_files(
        &config.security.jwt_private_key_path,
        &config.security.jwt_public_key_path,
        &config.security.jwks_kid,
    )
    .map_err(|e| anyhow::anyhow!("Failed to load JWT keys: {}", e))?;

    let sessions = Arc::new(
        SessionStore::new(
            config.auth.session_secret.as_bytes().to_vec(),
            config.auth.session_cookie_name.clone(),
            !config.dev_mode,
            config.auth.session_max_age,
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize session store: {}", e))?,
    );

    let secret_box = Arc::new(
        SecretBox::new(&config.security.provider_secret_key)
            .map_err(|e| anyhow::anyhow!("Failed to initialize provider secret key: {}", e))?,
    );

    // Repositories
    let users = Arc::new(UserRepository::new(&db));
    let identities = Arc::new(UserIdentityRepository::new(&db));
    let members = Arc::new(ProjectMemberRepository::new(&db));
    let roles = Arc::new(RoleRepository::new(&db));
    let clients = Arc::new(OAuthClientRepository::new(&db));
    let providers = Arc::new(OAuthProviderRepository::new(&db));
    let codes = Arc::new(AuthorizationCodeRepository::new(&db));
    let refresh_tokens = Arc::new(RefreshTokenRepository::new(&db));
    let consents = Arc::new(UserConsentRepository::new(&db));
    let otps = Arc::new(OtpTokenRepository::new(&db));
    let verifications = Arc::new(VerificationTokenRepository::new(&db));
    let audit_logs = Arc::new(AuditLogRepository::new(&db));
    info!("Repositories initialized");

    roles
        .seed_built_in()
        .await
        .context("Failed to seed built-in roles")?;

    // Services
    let passwords = Arc::new(PasswordService::default());
    let audit = Arc::new(AuditService::new(audit_logs));
    let tokens = Arc::new(TokenService::new(
        keys,
        config.auth.issuer.clone(),
        config.auth.access_token_expiry,
    ));
    let claims = Arc::new(ClaimsService::new(roles, members.clone()));
    let client_service = Arc::new(OAuthClientService::new(
        clients.clone(),
        passwords.clone(),
        audit.clone(),
    ));
    let provider_service = Arc::new(ProviderService::new(
        providers.clone(),
        secret_box,
        audit.clone(),
    ));

    let email_sender = build_email_sender(&config).await?;
    let email = Arc::new(EmailService::new(email_sender));

    let registration = Arc::new(RegistrationService::new(
        users.clone(),
        identities,
        members,
        verifications.clone(),
        email.clone(),
        config.auth.auto_activate,
        config.auth.external_base.clone(),
    ));
    info!("Auth services initialized");

    // API states
    let oauth_state = OAuthState {
        clients: clients.clone(),
        client_service,
        users: users.clone(),
        codes,
        refresh_tokens,
        consents,
        scopes: Arc::new(altalune_auth::oauth::ScopeRegistry::default()),
        claims,
        tokens: tokens.clone(),
        sessions: sessions.clone(),
        audit: audit.clone(),
        code_expiry_secs: config.auth.code_expiry,
        refresh_token_expiry_secs: config.auth.refresh_token_expiry,
    };

    let login_state = LoginState {
        providers,
        provider_service,
        clients,
        registration,
        sessions: sessions.clone(),
        audit: audit.clone(),
    };

    let otp_state = OtpState {
        users,
        otps,
        verifications,
        email,
        sessions,
        audit,
        otp_expiry_secs: config.auth.otp_expiry,
        otp_rate_limit: config.auth.otp_rate_limit,
        otp_rate_limit_window_secs: config.auth.otp_rate_limit_window,
    };

    let well_known_state = WellKnownState {
        tokens,
        external_base: config.auth.external_base.clone(),
        issuer: config.auth.issuer.clone(),
    };

    let health_state = HealthState {
        db: Some(db),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    let app = axum::Router::new()
        .merge(login_router(login_state))
        .merge(otp_router(otp_state))
        .merge(health_router(health_state))
        .nest("/oauth", oauth_router(oauth_state))
        .nest("/.well-known", well_known_router(well_known_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = format!("{}:{}", config.auth.host, config.auth.port);
    info!("Authorization server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    mongo_client.shutdown().await;
    info!("Altalune authorization server shutdown complete");
    Ok(())
}

async fn build_email_sender(
    config: &altalune_config::AppConfig,
) -> Result<Arc<dyn altalune_auth::EmailSender>> {
    let email = &config.notification.email;
    match email.provider.as_str() {
        "resend" => Ok(Arc::new(altalune_auth::email::ResendSender::new(
            email.resend_api_key.clone(),
            email.from_address.clone(),
        ))),
        #[cfg(feature = "ses")]
        "ses" => Ok(Arc::new(
            altalune_auth::email::SesSender::new(&email.ses_region, email.from_address.clone())
                .await,
        )),
        #[cfg(not(feature = "ses"))]
        "ses" => bail!("Email provider 'ses' requires a build with the 'ses' feature"),
        other => bail!("Unsupported email provider '{}'", other),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");

    // Bound the drain: if in-flight requests have not finished after the
    // grace period, exit anyway.
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        error!("Shutdown drain timed out, exiting");
        std::process::exit(1);
    });
}
