//! Altalune API Server
//!
//! Hosts the token-exchange proxy: public SPA clients complete the
//! code→token exchange here without ever holding the dashboard client's
//! confidential secret. The wider API surface lives elsewhere; this
//! binary carries only the auth-critical endpoint plus health probes.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use altalune_auth::api::{exchange_router, health_router, ExchangeState, HealthState};
use altalune_config::ConfigLoader;

#[derive(Parser)]
#[command(name = "altalune-api-server", about = "Altalune API server (token-exchange proxy)")]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    altalune_common::logging::init_logging("altalune-api-server");

    let cli = Cli::parse();

    let loader = match cli.config.as_deref() {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("Failed to load configuration")?;
    config
        .validate_api_server()
        .context("Invalid configuration")?;

    let exchange_state = ExchangeState {
        http: reqwest::Client::new(),
        auth_server_url: config.proxy.auth_server_url.clone(),
        client_id: config.proxy.dashboard_client_id.clone(),
        client_secret: config.proxy.dashboard_client_secret.clone(),
    };

    let health_state = HealthState {
        db: None,
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    let app = axum::Router::new()
        .merge(exchange_router(exchange_state))
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.proxy.host, config.proxy.port);
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Altalune API server shutdown complete");
    Ok(())
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
}
