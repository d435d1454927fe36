//! Configuration management for Carbonserver
//!
//! Supports loading configuration from:
//! - Default values
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - The flat variables used by deployments (DATABASE_URL, AUTH_PROVIDER, ...)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending migrations at startup
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

/// Which identity provider validates bearer tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// OpenID Connect JWTs validated against the issuer's JWKS
    Oidc,
    /// Authentication disabled (development only)
    None,
}

impl FromStr for AuthProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oidc" => Ok(AuthProviderKind::Oidc),
            "none" => Ok(AuthProviderKind::None),
            other => Err(ConfigError::Message(format!(
                "Unknown authentication provider: {}. Supported providers: 'oidc', 'none'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Identity provider selector
    #[serde(default = "default_auth_provider")]
    pub provider: AuthProviderKind,

    /// OIDC issuer URL
    #[serde(default)]
    pub issuer_url: String,

    /// OIDC client id
    #[serde(default)]
    pub client_id: String,

    /// OIDC client secret
    #[serde(default)]
    pub client_secret: String,

    /// JWKS URL (discovered from the issuer when absent)
    pub jwks_url: Option<String>,

    /// Expected `aud` claim (falls back to the client id; not checked when both are empty)
    pub audience: Option<String>,

    /// How long fetched signing keys are trusted
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,

    /// Header carrying project tokens
    #[serde(default = "default_project_token_header")]
    pub project_token_header: String,

    /// Argon2 memory cost for project token hashes (KiB)
    #[serde(default = "default_token_hash_memory_kib")]
    pub token_hash_memory_kib: u32,

    /// Argon2 iteration count for project token hashes
    #[serde(default = "default_token_hash_iterations")]
    pub token_hash_iterations: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 256 }
fn default_database_url() -> String { "postgres://localhost/carbonserver".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_auth_provider() -> AuthProviderKind { AuthProviderKind::Oidc }
fn default_jwks_cache_ttl() -> u64 { 3600 }
fn default_project_token_header() -> String { "x-project-token".to_string() }
fn default_token_hash_memory_kib() -> u32 { 19 * 1024 }
fn default_token_hash_iterations() -> u32 { 2 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "carbonserver".to_string() }
fn default_enabled() -> bool { true }

/// Flat environment variables honoured for compatibility with existing deployments
const FLAT_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("AUTH_PROVIDER", "auth.provider"),
    ("OIDC_ISSUER_URL", "auth.issuer_url"),
    ("OIDC_CLIENT_ID", "auth.client_id"),
    ("OIDC_CLIENT_SECRET", "auth.client_secret"),
    ("OIDC_JWKS_URL", "auth.jwks_url"),
    ("OIDC_AUDIENCE", "auth.audience"),
    ("SERVER_HOST", "server.host"),
    ("API_PORT", "server.port"),
];

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("database.url", default_database_url())?
            .set_default("auth.provider", "oidc")?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            );

        for (var, key) in FLAT_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.provider == AuthProviderKind::Oidc
            && self.auth.issuer_url.is_empty()
            && self.auth.jwks_url.is_none()
        {
            return Err(ConfigError::Message(
                "auth.issuer_url (OIDC_ISSUER_URL) is required when auth.provider is 'oidc'"
                    .to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "database.min_connections must not exceed database.max_connections".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Socket address string the server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
                max_concurrent_requests: default_max_concurrent(),
            },
            database: DatabaseConfig {
                url: default_database_url(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                run_migrations: default_enabled(),
            },
            auth: AuthConfig {
                provider: default_auth_provider(),
                issuer_url: String::new(),
                client_id: String::new(),
                client_secret: String::new(),
                jwks_url: None,
                audience: None,
                jwks_cache_ttl_secs: default_jwks_cache_ttl(),
                project_token_header: default_project_token_header(),
                token_hash_memory_kib: default_token_hash_memory_kib(),
                token_hash_iterations: default_token_hash_iterations(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.project_token_header, "x-project-token");
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OIDC".parse::<AuthProviderKind>().unwrap(), AuthProviderKind::Oidc);
        assert_eq!("none".parse::<AuthProviderKind>().unwrap(), AuthProviderKind::None);
        assert!("fief2".parse::<AuthProviderKind>().is_err());
    }

    #[test]
    fn test_oidc_requires_issuer() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.issuer_url = "https://auth.example.org".into();
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.auth.provider = AuthProviderKind::None;
        assert!(config.validate().is_ok());
    }
}
