//! Configuration management
//!
//! This module handles loading and parsing configuration for the Quillpress
//! blog server. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// OAuth (identity provider) configuration
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
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
    /// Public base URL of this deployment (used in OAuth redirects)
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            public_url: default_public_url(),
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

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
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
    "data/quillpress.db".to_string()
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

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// Session configuration
///
/// Sessions are renewed on use: a lookup that finds a session with less than
/// half its lifetime remaining extends it by the full lifetime, so an active
/// client is never logged out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_lifetime_days")]
    pub lifetime_days: i64,
    /// Whether to set the Secure attribute on the session cookie
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_days: default_session_lifetime_days(),
            cookie_secure: false,
        }
    }
}

fn default_session_lifetime_days() -> i64 {
    30
}

/// OAuth configuration for the external identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// OAuth client ID
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URL registered with the provider.
    /// Empty means `<server.public_url>/api/v1/auth/google/callback`.
    #[serde(default)]
    pub redirect_url: String,
}

impl OAuthConfig {
    /// Effective redirect URL, falling back to the conventional path under
    /// the server's public URL.
    pub fn redirect_url_or_default(&self, public_url: &str) -> String {
        if self.redirect_url.is_empty() {
            format!(
                "{}/api/v1/auth/google/callback",
                public_url.trim_end_matches('/')
            )
        } else {
            self.redirect_url.clone()
        }
    }
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

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - QUILLPRESS_SERVER_HOST
    /// - QUILLPRESS_SERVER_PORT
    /// - QUILLPRESS_SERVER_CORS_ORIGIN
    /// - QUILLPRESS_SERVER_PUBLIC_URL
    /// - QUILLPRESS_DATABASE_DRIVER
    /// - QUILLPRESS_DATABASE_URL
    /// - QUILLPRESS_CACHE_TTL_SECONDS
    /// - QUILLPRESS_SESSION_LIFETIME_DAYS
    /// - QUILLPRESS_SESSION_COOKIE_SECURE
    /// - QUILLPRESS_OAUTH_CLIENT_ID
    /// - QUILLPRESS_OAUTH_CLIENT_SECRET
    /// - QUILLPRESS_OAUTH_REDIRECT_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QUILLPRESS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("QUILLPRESS_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("QUILLPRESS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(public_url) = std::env::var("QUILLPRESS_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        if let Ok(driver) = std::env::var("QUILLPRESS_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("QUILLPRESS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("QUILLPRESS_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(days) = std::env::var("QUILLPRESS_SESSION_LIFETIME_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                if days > 0 {
                    self.session.lifetime_days = days;
                }
            }
        }
        if let Ok(secure) = std::env::var("QUILLPRESS_SESSION_COOKIE_SECURE") {
            self.session.cookie_secure = secure == "true" || secure == "1";
        }

        if let Ok(id) = std::env::var("QUILLPRESS_OAUTH_CLIENT_ID") {
            self.oauth.client_id = id;
        }
        if let Ok(secret) = std::env::var("QUILLPRESS_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = secret;
        }
        if let Ok(url) = std::env::var("QUILLPRESS_OAUTH_REDIRECT_URL") {
            self.oauth.redirect_url = url;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.session.lifetime_days, 30);
        assert!(!config.session.cookie_secure);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("does-not-exist.yml"))
            .expect("Missing file should yield defaults");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(
            file,
            "server:\n  port: 9000\noauth:\n  client_id: abc123"
        )
        .expect("Failed to write temp file");

        let config = Config::load(file.path()).expect("Failed to load config");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.oauth.client_id, "abc123");
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "server: [not a mapping").expect("Failed to write temp file");

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_redirect_url_fallback() {
        let oauth = OAuthConfig::default();
        assert_eq!(
            oauth.redirect_url_or_default("http://localhost:8080/"),
            "http://localhost:8080/api/v1/auth/google/callback"
        );

        let oauth = OAuthConfig {
            redirect_url: "https://blog.example.com/cb".to_string(),
            ..Default::default()
        };
        assert_eq!(
            oauth.redirect_url_or_default("http://localhost:8080"),
            "https://blog.example.com/cb"
        );
    }
}
