//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on in-memory stores
/// - `DB_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `JWT_SECRET`: token signing secret
/// - `REQUEST_TIMEOUT_MS`: deadline for one storage call (default: `5000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON lines, anything else for plain text
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: account created by the seed step
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    pub log_level: String,
    pub log_json: bool,
    pub admin_email: String,
    pub admin_password: String,
}

const DEFAULT_JWT_SECRET: &str = "supersecretkey_change_me";

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: var("DATABASE_URL"),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.db_max_connections),
            jwt_secret: var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            request_timeout: var("REQUEST_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            admin_email: var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when the signing secret was left at its well-known default.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            db_max_connections: 10,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            request_timeout: Duration::from_millis(5000),
            log_level: "info".to_string(),
            log_json: false,
            admin_email: "admin@stocklab.local".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}
