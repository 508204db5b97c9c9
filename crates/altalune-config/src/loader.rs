//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "altalune.toml",
    "config.toml",
    "./config/altalune.toml",
    "/etc/altalune/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("ALTALUNE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // Auth server
        if let Ok(val) = env::var("ALTALUNE_AUTH_HOST") {
            config.auth.host = val;
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_PORT") {
            if let Ok(port) = val.parse() {
                config.auth.port = port;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_EXTERNAL_BASE") {
            config.auth.external_base = val;
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_ISSUER") {
            config.auth.issuer = val;
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_SESSION_SECRET") {
            config.auth.session_secret = val;
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_CODE_EXPIRY") {
            if let Ok(secs) = val.parse() {
                config.auth.code_expiry = secs;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_ACCESS_TOKEN_EXPIRY") {
            if let Ok(secs) = val.parse() {
                config.auth.access_token_expiry = secs;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_REFRESH_TOKEN_EXPIRY") {
            if let Ok(secs) = val.parse() {
                config.auth.refresh_token_expiry = secs;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_OTP_EXPIRY") {
            if let Ok(secs) = val.parse() {
                config.auth.otp_expiry = secs;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_OTP_RATE_LIMIT") {
            if let Ok(limit) = val.parse() {
                config.auth.otp_rate_limit = limit;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_OTP_RATE_LIMIT_WINDOW") {
            if let Ok(secs) = val.parse() {
                config.auth.otp_rate_limit_window = secs;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_AUTH_AUTO_ACTIVATE") {
            config.auth.auto_activate = val.parse().unwrap_or(true);
        }

        // MongoDB
        if let Ok(val) = env::var("ALTALUNE_MONGODB_URI") {
            config.mongodb.uri = val;
        }
        if let Ok(val) = env::var("ALTALUNE_MONGODB_DATABASE") {
            config.mongodb.database = val;
        }

        // Security
        if let Ok(val) = env::var("ALTALUNE_JWT_PRIVATE_KEY_PATH") {
            config.security.jwt_private_key_path = val;
        }
        if let Ok(val) = env::var("ALTALUNE_JWT_PUBLIC_KEY_PATH") {
            config.security.jwt_public_key_path = val;
        }
        if let Ok(val) = env::var("ALTALUNE_JWKS_KID") {
            config.security.jwks_kid = val;
        }
        if let Ok(val) = env::var("ALTALUNE_PROVIDER_SECRET_KEY") {
            config.security.provider_secret_key = val;
        }

        // Notification
        if let Ok(val) = env::var("ALTALUNE_EMAIL_PROVIDER") {
            config.notification.email.provider = val;
        }
        if let Ok(val) = env::var("ALTALUNE_EMAIL_FROM") {
            config.notification.email.from_address = val;
        }
        if let Ok(val) = env::var("ALTALUNE_RESEND_API_KEY") {
            config.notification.email.resend_api_key = val;
        }
        if let Ok(val) = env::var("ALTALUNE_SES_REGION") {
            config.notification.email.ses_region = val;
        }

        // Proxy
        if let Ok(val) = env::var("ALTALUNE_PROXY_PORT") {
            if let Ok(port) = val.parse() {
                config.proxy.port = port;
            }
        }
        if let Ok(val) = env::var("ALTALUNE_PROXY_AUTH_SERVER_URL") {
            config.proxy.auth_server_url = val;
        }
        if let Ok(val) = env::var("ALTALUNE_DASHBOARD_CLIENT_ID") {
            config.proxy.dashboard_client_id = val;
        }
        if let Ok(val) = env::var("ALTALUNE_DASHBOARD_CLIENT_SECRET") {
            config.proxy.dashboard_client_secret = val;
        }

        // Dev mode
        if let Ok(val) = env::var("ALTALUNE_DEV_MODE") {
            config.dev_mode = val == "true" || val == "1";
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
