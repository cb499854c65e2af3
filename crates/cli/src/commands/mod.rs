//! CLI subcommands.

pub mod admin;
pub mod data;
pub mod migrate;
pub mod user;

use ebano_storefront::config::{ConfigError, DatabaseConfig};
use ebano_storefront::db::create_pool;
use sqlx::PgPool;
use thiserror::Error;

/// Errors opening the database named by the environment.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the database configured by `DATABASE_URL` or `DB_*`.
///
/// # Errors
///
/// Returns `ConnectError` if the configuration is incomplete or the
/// connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();
    let config = DatabaseConfig::from_env()?;
    tracing::info!("Connecting to database...");
    Ok(create_pool(&config).await?)
}
