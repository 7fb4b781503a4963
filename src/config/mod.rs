//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file with environment
//! variables taking precedence (`SENDLATER_*`). Missing optional values are
//! filled with defaults; the OAuth client credentials have no sensible
//! defaults and are normally supplied through the environment.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Messaging-provider OAuth configuration
    #[serde(default)]
    pub oauth: OauthConfig,
    /// Session lifetime configuration
    #[serde(default)]
    pub sessions: SessionConfig,
    /// Stored provider-token lifetime configuration
    #[serde(default)]
    pub provider_token: ProviderTokenConfig,
    /// Delivery job configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
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
    /// SQLite database path (`:memory:` supported)
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/sendlater.db".to_string()
}

/// Messaging-provider OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    /// OAuth client id
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// OAuth redirect URI (this service's `/auth` endpoint)
    #[serde(default)]
    pub redirect_uri: String,
    /// Page the browser is sent to after login; defaults to
    /// `<cors_origin>/index.html` when empty
    #[serde(default)]
    pub landing_url: String,
    /// Allowed email domains for login
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Provider API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            landing_url: String::new(),
            allowed_domains: Vec::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://webexapis.com/v1".to_string()
}

/// Session lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session time-to-live in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    2
}

/// Stored provider-token lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokenConfig {
    /// Token time-to-live in days
    #[serde(default = "default_token_ttl_days")]
    pub ttl_days: i64,
}

impl Default for ProviderTokenConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_token_ttl_days(),
        }
    }
}

fn default_token_ttl_days() -> i64 {
    13
}

/// Delivery job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Seconds between delivery scans
    #[serde(default = "default_delivery_interval")]
    pub interval_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_delivery_interval(),
        }
    }
}

fn default_delivery_interval() -> u64 {
    3600
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
    /// A missing or empty file yields default configuration; invalid YAML is
    /// an error with line/column detail.
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
    /// - SENDLATER_SERVER_HOST / SENDLATER_SERVER_PORT / SENDLATER_SERVER_CORS_ORIGIN
    /// - SENDLATER_DATABASE_URL
    /// - SENDLATER_OAUTH_CLIENT_ID / SENDLATER_OAUTH_CLIENT_SECRET
    /// - SENDLATER_OAUTH_REDIRECT_URI / SENDLATER_OAUTH_LANDING_URL
    /// - SENDLATER_OAUTH_ALLOWED_DOMAINS (comma-separated)
    /// - SENDLATER_OAUTH_API_BASE
    /// - SENDLATER_SESSION_TTL_HOURS
    /// - SENDLATER_TOKEN_TTL_DAYS
    /// - SENDLATER_DELIVERY_INTERVAL_SECS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Post-login landing page, derived from the CORS origin when unset
    pub fn landing_url(&self) -> String {
        if self.oauth.landing_url.is_empty() {
            format!("{}/index.html", self.server.cors_origin)
        } else {
            self.oauth.landing_url.clone()
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SENDLATER_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SENDLATER_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SENDLATER_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("SENDLATER_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(client_id) = std::env::var("SENDLATER_OAUTH_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("SENDLATER_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = client_secret;
        }
        if let Ok(redirect_uri) = std::env::var("SENDLATER_OAUTH_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }
        if let Ok(landing_url) = std::env::var("SENDLATER_OAUTH_LANDING_URL") {
            self.oauth.landing_url = landing_url;
        }
        if let Ok(domains) = std::env::var("SENDLATER_OAUTH_ALLOWED_DOMAINS") {
            self.oauth.allowed_domains = domains
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }
        if let Ok(api_base) = std::env::var("SENDLATER_OAUTH_API_BASE") {
            self.oauth.api_base = api_base;
        }

        if let Ok(ttl) = std::env::var("SENDLATER_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.sessions.ttl_hours = ttl;
            }
        }
        if let Ok(ttl) = std::env::var("SENDLATER_TOKEN_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.provider_token.ttl_days = ttl;
            }
        }
        if let Ok(interval) = std::env::var("SENDLATER_DELIVERY_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse::<u64>() {
                self.delivery.interval_secs = interval;
            }
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

// Shared mutex for tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: &[&str] = &[
        "SENDLATER_SERVER_HOST",
        "SENDLATER_SERVER_PORT",
        "SENDLATER_SERVER_CORS_ORIGIN",
        "SENDLATER_DATABASE_URL",
        "SENDLATER_OAUTH_CLIENT_ID",
        "SENDLATER_OAUTH_CLIENT_SECRET",
        "SENDLATER_OAUTH_REDIRECT_URI",
        "SENDLATER_OAUTH_LANDING_URL",
        "SENDLATER_OAUTH_ALLOWED_DOMAINS",
        "SENDLATER_OAUTH_API_BASE",
        "SENDLATER_SESSION_TTL_HOURS",
        "SENDLATER_TOKEN_TTL_DAYS",
        "SENDLATER_DELIVERY_INTERVAL_SECS",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "data/sendlater.db");
        assert_eq!(config.sessions.ttl_hours, 2);
        assert_eq!(config.provider_token.ttl_days, 13);
        assert_eq!(config.delivery.interval_secs, 3600);
        assert_eq!(config.oauth.api_base, "https://webexapis.com/v1");
        assert!(config.oauth.allowed_domains.is_empty());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nsessions:\n  ttl_hours: 24\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.sessions.ttl_hours, 24);
        // Defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider_token.ttl_days, 13);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://app.example.com"
database:
  url: "data/test.db"
oauth:
  client_id: "cid"
  client_secret: "secret"
  redirect_uri: "https://api.example.com/auth"
  allowed_domains: ["example.com"]
delivery:
  interval_secs: 600
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "data/test.db");
        assert_eq!(config.oauth.client_id, "cid");
        assert_eq!(config.oauth.allowed_domains, vec!["example.com"]);
        assert_eq!(config.delivery.interval_secs, 600);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_landing_url_derived_from_cors_origin() {
        let config = Config::default();
        assert_eq!(config.landing_url(), "http://localhost:3000/index.html");

        let mut config = Config::default();
        config.oauth.landing_url = "https://app.example.com/home".to_string();
        assert_eq!(config.landing_url(), "https://app.example.com/home");
    }

    #[test]
    fn test_env_override_server_and_oauth() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("SENDLATER_SERVER_PORT", "4000");
        std::env::set_var("SENDLATER_OAUTH_CLIENT_ID", "env-cid");
        std::env::set_var("SENDLATER_OAUTH_ALLOWED_DOMAINS", "a.com, b.com");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.oauth.client_id, "env-cid");
        assert_eq!(config.oauth.allowed_domains, vec!["a.com", "b.com"]);

        std::env::remove_var("SENDLATER_SERVER_PORT");
        std::env::remove_var("SENDLATER_OAUTH_CLIENT_ID");
        std::env::remove_var("SENDLATER_OAUTH_ALLOWED_DOMAINS");
    }

    #[test]
    fn test_env_override_invalid_port_ignored() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8081\n").unwrap();

        std::env::set_var("SENDLATER_SERVER_PORT", "not_a_number");

        let config = Config::load_with_env(file.path()).unwrap();
        assert_eq!(config.server.port, 8081);

        std::env::remove_var("SENDLATER_SERVER_PORT");
    }
}
