//! Configuration management
//!
//! This module handles loading and parsing configuration for the Gwalk
//! backend. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Route guard configuration
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/gwalk.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Whether the service runs behind HTTPS. Selects the secure-prefixed
    /// session cookie name and adds the Secure attribute on Set-Cookie.
    #[serde(default)]
    pub secure_cookies: bool,
    /// External identity provider endpoints
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
            secure_cookies: false,
            provider: ProviderConfig::default(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// OAuth identity provider endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OAuth client id
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Token exchange endpoint
    #[serde(default)]
    pub token_url: String,
    /// Userinfo endpoint
    #[serde(default)]
    pub userinfo_url: String,
    /// Redirect URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,
}

/// Route guard configuration: the guarded path tree and redirect targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Path prefix that requires the admin role
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    /// Sign-in redirect target
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    /// Unauthorized redirect target
    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,
    /// Banned redirect target
    #[serde(default = "default_banned_path")]
    pub banned_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
            sign_in_path: default_sign_in_path(),
            unauthorized_path: default_unauthorized_path(),
            banned_path: default_banned_path(),
        }
    }
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_sign_in_path() -> String {
    "/sign-in".to_string()
}

fn default_unauthorized_path() -> String {
    "/unauthorized".to_string()
}

fn default_banned_path() -> String {
    "/banned".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - GWALK_SERVER_HOST
    /// - GWALK_SERVER_PORT
    /// - GWALK_SERVER_CORS_ORIGIN
    /// - GWALK_DATABASE_DRIVER
    /// - GWALK_DATABASE_URL
    /// - GWALK_AUTH_SESSION_DAYS
    /// - GWALK_AUTH_SECURE_COOKIES
    /// - GWALK_AUTH_CLIENT_ID
    /// - GWALK_AUTH_CLIENT_SECRET
    /// - GWALK_AUTH_TOKEN_URL
    /// - GWALK_AUTH_USERINFO_URL
    /// - GWALK_AUTH_REDIRECT_URI
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GWALK_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GWALK_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("GWALK_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("GWALK_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                other => tracing::warn!("Unknown database driver '{}', keeping configured value", other),
            }
        }
        if let Ok(url) = std::env::var("GWALK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(days) = std::env::var("GWALK_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.auth.session_days = days;
            }
        }
        if let Ok(secure) = std::env::var("GWALK_AUTH_SECURE_COOKIES") {
            self.auth.secure_cookies = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(client_id) = std::env::var("GWALK_AUTH_CLIENT_ID") {
            self.auth.provider.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("GWALK_AUTH_CLIENT_SECRET") {
            self.auth.provider.client_secret = client_secret;
        }
        if let Ok(token_url) = std::env::var("GWALK_AUTH_TOKEN_URL") {
            self.auth.provider.token_url = token_url;
        }
        if let Ok(userinfo_url) = std::env::var("GWALK_AUTH_USERINFO_URL") {
            self.auth.provider.userinfo_url = userinfo_url;
        }
        if let Ok(redirect_uri) = std::env::var("GWALK_AUTH_REDIRECT_URI") {
            self.auth.provider.redirect_uri = redirect_uri;
        }
    }
}
