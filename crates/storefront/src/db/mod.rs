//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Customer and admin accounts
//! - `products` - Catalog with price (store currency) and optional stock
//! - `orders` / `order_lines` - Placed orders and their line snapshots
//! - `reviews` - Product reviews written by customers
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p ebano-cli -- migrate
//! ```

pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use thiserror::Error;

use crate::config::{DatabaseConfig, DatabaseTarget, DbSslMode};

pub use orders::{OrderRepository, PlaceOrderError};
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, referenced product).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Build connection options, applying the TLS rule.
///
/// An explicit `DB_SSL_MODE` wins; a URL carrying its own `sslmode` keeps it;
/// otherwise local hosts connect in plain text and remote hosts require TLS.
///
/// # Errors
///
/// Returns `sqlx::Error::Configuration` if the URL cannot be parsed.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let (options, url_has_ssl_mode) = match &config.target {
        DatabaseTarget::Url(url) => {
            let raw = url.expose_secret();
            (PgConnectOptions::from_str(raw)?, raw.contains("sslmode="))
        }
        DatabaseTarget::Parts {
            host,
            port,
            name,
            user,
            password,
        } => (
            PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(name)
                .username(user)
                .password(password.expose_secret()),
            false,
        ),
    };

    let mode = match config.ssl_mode {
        Some(mode) => mode,
        None if url_has_ssl_mode => return Ok(options),
        None => DbSslMode::for_host(options.get_host()),
    };

    Ok(options.ssl_mode(match mode {
        DbSslMode::Disable => PgSslMode::Disable,
        DbSslMode::Prefer => PgSslMode::Prefer,
        DbSslMode::Require => PgSslMode::Require,
    }))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the options are invalid or the connection cannot
/// be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = connect_options(config)?;

    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn parts(host: &str) -> DatabaseConfig {
        DatabaseConfig {
            target: DatabaseTarget::Parts {
                host: host.to_string(),
                port: 5432,
                name: "ebano".to_string(),
                user: "ebano".to_string(),
                password: SecretString::from("pw"),
            },
            ssl_mode: None,
        }
    }

    #[test]
    fn test_local_host_disables_tls() {
        let options = connect_options(&parts("localhost")).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
    }

    #[test]
    fn test_remote_host_requires_tls() {
        let options = connect_options(&parts("db.example.net")).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
    }

    #[test]
    fn test_explicit_mode_wins() {
        let mut config = parts("db.example.net");
        config.ssl_mode = Some(DbSslMode::Prefer);
        let options = connect_options(&config).unwrap();
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Prefer));
    }

    #[test]
    fn test_url_target() {
        let config = DatabaseConfig::from_url(SecretString::from(
            "postgres://ebano:pw@127.0.0.1:5433/ebano",
        ));
        let options = connect_options(&config).unwrap();
        assert_eq!(options.get_host(), "127.0.0.1");
        assert_eq!(options.get_port(), 5433);
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Disable));
    }
}
