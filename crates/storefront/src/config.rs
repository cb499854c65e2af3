//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string, **or** the discrete
//!   `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASS` (and optional `DB_PORT`)
//! - `EBANO_BASE_URL` - Public URL for the storefront
//! - `EBANO_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DB_SSL_MODE` - `disable`, `prefer` or `require` (default: `disable` for
//!   local hosts, `require` otherwise)
//! - `EBANO_HOST` - Bind address (default: 127.0.0.1)
//! - `EBANO_PORT` - Listen port (default: 3000)
//! - `STORE_CURRENCY` - Currency prices are stored in (default: COP)
//! - `DISPLAY_CURRENCY` - Currency customers see (default: USD)
//! - `EXCHANGE_API_URL` - Exchange-rate endpoint (default: exchangerate.host)
//! - `EXCHANGE_API_KEY` / `CURRENCY_API_KEY` - Exchange-rate access key
//! - `EXCHANGE_TTL_SECONDS` - Rate cache lifetime (default: 43200)
//! - `EXCHANGE_REQUEST_TIMEOUT` - Upstream timeout in seconds (default: 8)
//! - `EXCHANGE_FALLBACK_RATE` - Rate used when the upstream fails
//! - `METABASE_SITE_URL`, `METABASE_SECRET_KEY`, `METABASE_DASHBOARD_ID` -
//!   Embedded analytics dashboard
//! - `METABASE_TOKEN_TTL_SECONDS` - Embed token lifetime (default: 600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_EXCHANGE_API_URL: &str = "https://api.exchangerate.host/latest";

/// Hosts treated as local when choosing a TLS mode.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Exchange-rate configuration
    pub currency: CurrencyConfig,
    /// Embedded analytics configuration
    pub analytics: AnalyticsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// TLS requirement for the database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbSslMode {
    Disable,
    Prefer,
    Require,
}

impl DbSslMode {
    /// Default mode for a host: plain connections locally, TLS everywhere else.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        if LOCAL_HOSTS.contains(&host) {
            Self::Disable
        } else {
            Self::Require
        }
    }
}

impl FromStr for DbSslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            other => Err(format!("expected disable, prefer or require (got {other})")),
        }
    }
}

/// Where to find the database.
#[derive(Clone)]
pub enum DatabaseTarget {
    /// A full connection URL.
    Url(SecretString),
    /// Discrete connection parameters.
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: SecretString,
    },
}

/// Database connection configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    /// Explicit `DB_SSL_MODE`; `None` means pick from the host.
    pub ssl_mode: Option<DbSslMode>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("DatabaseConfig");
        match &self.target {
            DatabaseTarget::Url(_) => s.field("url", &"[REDACTED]"),
            DatabaseTarget::Parts {
                host,
                port,
                name,
                user,
                ..
            } => s
                .field("host", host)
                .field("port", port)
                .field("name", name)
                .field("user", user)
                .field("password", &"[REDACTED]"),
        };
        s.field("ssl_mode", &self.ssl_mode).finish()
    }
}

impl DatabaseConfig {
    /// Build from a single connection URL.
    #[must_use]
    pub const fn from_url(url: SecretString) -> Self {
        Self {
            target: DatabaseTarget::Url(url),
            ssl_mode: None,
        }
    }

    /// Read `DATABASE_URL`, or the discrete `DB_*` variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ssl_mode = get_optional_env("DB_SSL_MODE")
            .map(|v| {
                v.parse::<DbSslMode>()
                    .map_err(|e| ConfigError::InvalidEnvVar("DB_SSL_MODE".to_string(), e))
            })
            .transpose()?;

        if let Some(url) = get_optional_env("DATABASE_URL") {
            return Ok(Self {
                target: DatabaseTarget::Url(SecretString::from(url)),
                ssl_mode,
            });
        }

        let port = get_env_or_default("DB_PORT", "5432")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DB_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            target: DatabaseTarget::Parts {
                host: get_required_env("DB_HOST")?,
                port,
                name: get_required_env("DB_NAME")?,
                user: get_required_env("DB_USER")?,
                password: get_required_secret("DB_PASS")?,
            },
            ssl_mode,
        })
    }
}

/// Exchange-rate service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CurrencyConfig {
    /// Currency prices are stored in (e.g. COP)
    pub store_currency: String,
    /// Currency customers see (e.g. USD)
    pub display_currency: String,
    /// Exchange-rate endpoint
    pub api_url: String,
    /// Optional access key sent as `access_key`
    pub api_key: Option<SecretString>,
    /// How long a fetched rate stays fresh
    pub ttl: Duration,
    /// Upstream request timeout
    pub request_timeout: Duration,
    /// Rate substituted when the upstream fails; `None` disables the fallback
    pub fallback_rate: Option<Decimal>,
}

impl std::fmt::Debug for CurrencyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyConfig")
            .field("store_currency", &self.store_currency)
            .field("display_currency", &self.display_currency)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .field("request_timeout", &self.request_timeout)
            .field("fallback_rate", &self.fallback_rate)
            .finish()
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            store_currency: "COP".to_string(),
            display_currency: "USD".to_string(),
            api_url: DEFAULT_EXCHANGE_API_URL.to_string(),
            api_key: None,
            ttl: Duration::from_secs(12 * 60 * 60),
            request_timeout: Duration::from_secs(8),
            fallback_rate: None,
        }
    }
}

impl CurrencyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let fallback_rate = get_optional_env("EXCHANGE_FALLBACK_RATE")
            .map(|v| {
                Decimal::from_str(v.trim()).map_err(|e| {
                    ConfigError::InvalidEnvVar("EXCHANGE_FALLBACK_RATE".to_string(), e.to_string())
                })
            })
            .transpose()?;

        if fallback_rate.is_some_and(|r| r <= Decimal::ZERO) {
            return Err(ConfigError::InvalidEnvVar(
                "EXCHANGE_FALLBACK_RATE".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            store_currency: get_env_or_default("STORE_CURRENCY", "COP").to_uppercase(),
            display_currency: get_env_or_default("DISPLAY_CURRENCY", "USD").to_uppercase(),
            api_url: get_env_or_default("EXCHANGE_API_URL", DEFAULT_EXCHANGE_API_URL),
            api_key: get_optional_env("EXCHANGE_API_KEY")
                .or_else(|| get_optional_env("CURRENCY_API_KEY"))
                .map(SecretString::from),
            ttl: Duration::from_secs(get_seconds("EXCHANGE_TTL_SECONDS", 43_200)?),
            request_timeout: Duration::from_secs(get_seconds("EXCHANGE_REQUEST_TIMEOUT", 8)?),
            fallback_rate,
        })
    }
}

/// Embedded analytics (Metabase) configuration.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct AnalyticsConfig {
    /// Metabase site URL, e.g. `https://metabase.example.com`
    pub site_url: Option<String>,
    /// Embedding secret used to sign dashboard tokens
    pub secret_key: Option<SecretString>,
    /// Dashboard to embed
    pub dashboard_id: Option<i64>,
    /// Lifetime of a signed embed token
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AnalyticsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsConfig")
            .field("site_url", &self.site_url)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("dashboard_id", &self.dashboard_id)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            secret_key: None,
            dashboard_id: None,
            token_ttl: Duration::from_secs(600),
        }
    }
}

impl AnalyticsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let dashboard_id = get_optional_env("METABASE_DASHBOARD_ID")
            .map(|v| {
                v.trim().parse::<i64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("METABASE_DASHBOARD_ID".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            site_url: get_optional_env("METABASE_SITE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            secret_key: get_optional_env("METABASE_SECRET_KEY").map(SecretString::from),
            dashboard_id,
            token_ttl: Duration::from_secs(get_seconds("METABASE_TOKEN_TTL_SECONDS", 600)?),
        })
    }

    /// Origin allowed to be framed, when analytics is configured.
    #[must_use]
    pub fn frame_origin(&self) -> Option<String> {
        let site = url::Url::parse(self.site_url.as_deref()?).ok()?;
        Some(site.origin().ascii_serialization())
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig::from_env()?;
        let host = get_env_or_default("EBANO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("EBANO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("EBANO_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EBANO_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("EBANO_BASE_URL")?;
        let session_secret = get_validated_secret("EBANO_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "EBANO_SESSION_SECRET")?;

        Ok(Self {
            database,
            host,
            port,
            base_url,
            session_secret,
            currency: CurrencyConfig::from_env()?,
            analytics: AnalyticsConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a whole number of seconds, rejecting zero.
fn get_seconds(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_ssl_mode_for_host() {
        assert_eq!(DbSslMode::for_host("localhost"), DbSslMode::Disable);
        assert_eq!(DbSslMode::for_host("127.0.0.1"), DbSslMode::Disable);
        assert_eq!(DbSslMode::for_host("::1"), DbSslMode::Disable);
        assert_eq!(
            DbSslMode::for_host("dpg-abc.oregon-postgres.render.com"),
            DbSslMode::Require
        );
    }

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!("REQUIRE".parse::<DbSslMode>().unwrap(), DbSslMode::Require);
        assert_eq!("prefer".parse::<DbSslMode>().unwrap(), DbSslMode::Prefer);
        assert!("verify-full".parse::<DbSslMode>().is_err());
    }

    #[test]
    fn test_currency_defaults() {
        let config = CurrencyConfig::default();
        assert_eq!(config.store_currency, "COP");
        assert_eq!(config.display_currency, "USD");
        assert_eq!(config.ttl, Duration::from_secs(43_200));
        assert_eq!(config.request_timeout, Duration::from_secs(8));
        assert!(config.fallback_rate.is_none());
    }

    #[test]
    fn test_analytics_frame_origin() {
        let config = AnalyticsConfig {
            site_url: Some("https://metabase.example.com/some/path".to_string()),
            ..AnalyticsConfig::default()
        };
        assert_eq!(
            config.frame_origin().as_deref(),
            Some("https://metabase.example.com")
        );
        assert!(AnalyticsConfig::default().frame_origin().is_none());
    }

    #[test]
    fn test_database_config_debug_redacts_password() {
        let config = DatabaseConfig {
            target: DatabaseTarget::Parts {
                host: "db.internal".to_string(),
                port: 5432,
                name: "ebano".to_string(),
                user: "ebano_app".to_string(),
                password: SecretString::from("hunter2-very-private"),
            },
            ssl_mode: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("db.internal"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-very-private"));
    }

    #[test]
    fn test_currency_config_debug_redacts_key() {
        let config = CurrencyConfig {
            api_key: Some(SecretString::from("k3y-that-must-not-leak")),
            ..CurrencyConfig::default()
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k3y-that-must-not-leak"));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database: DatabaseConfig::from_url(SecretString::from("postgres://localhost/test")),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            currency: CurrencyConfig::default(),
            analytics: AnalyticsConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }
}
