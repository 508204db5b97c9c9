//! Altalune Configuration System
//!
//! This crate provides TOML-based configuration with environment variable
//! override support. Configuration is loaded once at startup and validated
//! before any service is constructed; invalid crypto material is fatal.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub mongodb: MongoConfig,
    pub security: SecurityConfig,
    pub notification: NotificationConfig,
    pub proxy: ProxyConfig,

    /// Enable development mode (relaxes cookie Secure flag)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            mongodb: MongoConfig::default(),
            security: SecurityConfig::default(),
            notification: NotificationConfig::default(),
            proxy: ProxyConfig::default(),
            dev_mode: false,
        }
    }
}

/// Authorization server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// External base URL used in redirects and upstream callbacks
    /// (e.g. "https://auth.example.com")
    pub external_base: String,
    /// JWT issuer claim
    pub issuer: String,
    /// Session cookie HMAC secret (must be at least 32 bytes)
    pub session_secret: String,
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session cookie MaxAge in seconds
    pub session_max_age: i64,
    /// Authorization code TTL in seconds
    pub code_expiry: i64,
    /// Access token TTL in seconds
    pub access_token_expiry: i64,
    /// Refresh token TTL in seconds
    pub refresh_token_expiry: i64,
    /// OTP TTL in seconds
    pub otp_expiry: i64,
    /// Maximum OTP requests per email per window
    pub otp_rate_limit: u64,
    /// OTP rate limit window in seconds
    pub otp_rate_limit_window: i64,
    /// When true, new users are activated immediately and receive a
    /// verification email; when false, an admin activates them first
    pub auto_activate: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
            external_base: "http://localhost:8180".to_string(),
            issuer: "altalune-oauth".to_string(),
            session_secret: String::new(),
            session_cookie_name: "altalune_auth".to_string(),
            session_max_age: 86400,
            code_expiry: 600,
            access_token_expiry: 3600,
            refresh_token_expiry: 2_592_000,
            otp_expiry: 300,
            otp_rate_limit: 3,
            otp_rate_limit_window: 900,
            auto_activate: true,
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "altalune".to_string(),
        }
    }
}

/// Cryptographic material configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Path to the PKCS8 RSA private key PEM used for RS256 signing
    pub jwt_private_key_path: String,
    /// Path to the PKIX RSA public key PEM
    pub jwt_public_key_path: String,
    /// Key identifier published in JWKS and JOSE headers
    pub jwks_kid: String,
    /// Base64-encoded 32-byte key for provider secret encryption at rest
    pub provider_secret_key: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_path: String::new(),
            jwt_public_key_path: String::new(),
            jwks_kid: String::new(),
            provider_secret_key: String::new(),
        }
    }
}

/// Email notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub email: EmailConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
        }
    }
}

/// Email provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Provider type: resend, ses
    pub provider: String,
    /// From address for all outgoing mail
    pub from_address: String,
    /// Resend API key (resend provider)
    pub resend_api_key: String,
    /// AWS region (ses provider)
    pub ses_region: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: "resend".to_string(),
            from_address: "no-reply@localhost".to_string(),
            resend_api_key: String::new(),
            ses_region: String::new(),
        }
    }
}

/// Token-exchange proxy configuration (API server side)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Authorization server token endpoint base (e.g. "http://localhost:8180")
    pub auth_server_url: String,
    /// Dashboard OAuth client id appended to exchange requests
    pub dashboard_client_id: String,
    /// Dashboard OAuth client secret appended to exchange requests
    pub dashboard_client_secret: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            auth_server_url: "http://localhost:8180".to_string(),
            dashboard_client_id: String::new(),
            dashboard_client_secret: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration required by the authorization server.
    ///
    /// Called once at startup; any failure here is fatal.
    pub fn validate_auth_server(&self) -> Result<(), ConfigError> {
        if self.auth.session_secret.len() < 32 {
            return Err(ConfigError::ValidationError(
                "auth.session_secret must be at least 32 bytes".to_string(),
            ));
        }
        if self.security.jwt_private_key_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "security.jwt_private_key_path is required".to_string(),
            ));
        }
        if self.security.jwt_public_key_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "security.jwt_public_key_path is required".to_string(),
            ));
        }
        if self.security.jwks_kid.is_empty() {
            return Err(ConfigError::ValidationError(
                "security.jwks_kid is required".to_string(),
            ));
        }
        if self.security.provider_secret_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "security.provider_secret_key is required (base64, 32 bytes)".to_string(),
            ));
        }
        if self.auth.code_expiry <= 0 || self.auth.access_token_expiry <= 0 {
            return Err(ConfigError::ValidationError(
                "token expiries must be positive".to_string(),
            ));
        }
        match self.notification.email.provider.as_str() {
            "resend" | "ses" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "notification.email.provider must be 'resend' or 'ses', got '{}'",
                    other
                )));
            }
        }
        Ok(())
    }

    /// Validate configuration required by the token-exchange proxy.
    pub fn validate_api_server(&self) -> Result<(), ConfigError> {
        if self.proxy.dashboard_client_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "proxy.dashboard_client_id is required".to_string(),
            ));
        }
        if self.proxy.dashboard_client_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "proxy.dashboard_client_secret is required".to_string(),
            ));
        }
        if self.proxy.auth_server_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "proxy.auth_server_url is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.session_secret = "0123456789abcdef0123456789abcdef".to_string();
        config.security.jwt_private_key_path = "/keys/private.pem".to_string();
        config.security.jwt_public_key_path = "/keys/public.pem".to_string();
        config.security.jwks_kid = "altalune-1".to_string();
        config.security.provider_secret_key =
            "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.auth.port, 8180);
        assert_eq!(config.auth.code_expiry, 600);
        assert_eq!(config.auth.access_token_expiry, 3600);
        assert_eq!(config.auth.refresh_token_expiry, 2_592_000);
        assert_eq!(config.auth.otp_expiry, 300);
        assert_eq!(config.auth.otp_rate_limit, 3);
        assert_eq!(config.auth.otp_rate_limit_window, 900);
        assert_eq!(config.auth.session_cookie_name, "altalune_auth");
        assert_eq!(config.notification.email.provider, "resend");
    }

    #[test]
    fn test_validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "too-short".to_string();
        assert!(config.validate_auth_server().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_key_paths() {
        let mut config = valid_config();
        config.security.jwt_private_key_path = String::new();
        assert!(config.validate_auth_server().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_email_provider() {
        let mut config = valid_config();
        config.notification.email.provider = "sendgrid".to_string();
        assert!(config.validate_auth_server().is_err());
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate_auth_server().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
dev_mode = true

[auth]
port = 9999
session_secret = "0123456789abcdef0123456789abcdef"

[security]
jwks_kid = "test-kid"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.auth.port, 9999);
        assert_eq!(config.security.jwks_kid, "test-kid");
        // Untouched sections keep their defaults
        assert_eq!(config.mongodb.database, "altalune");
    }

    #[test]
    fn test_proxy_validation() {
        let mut config = valid_config();
        assert!(config.validate_api_server().is_err());

        config.proxy.dashboard_client_id = "client".to_string();
        config.proxy.dashboard_client_secret = "secret".to_string();
        assert!(config.validate_api_server().is_ok());
    }
}
