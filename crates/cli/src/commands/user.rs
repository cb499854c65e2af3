//! User account diagnostics.
//!
//! # Usage
//!
//! ```bash
//! EBANO_CHECK_PASSWORD=... ebano-cli user check-password -e someone@example.com
//! ```

use ebano_core::Email;
use ebano_storefront::db::{RepositoryError, UserRepository};
use ebano_storefront::services::auth::verify_password;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from user commands.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] ebano_core::EmailError),

    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcome of a password check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCheck {
    pub matches: bool,
    pub active: bool,
}

/// Check whether `password` matches the stored hash for `email`.
///
/// # Errors
///
/// Returns `UserError::NotFound` if no account uses the email.
pub async fn check_password(email: &str, password: &SecretString) -> Result<PasswordCheck, UserError> {
    let email = Email::normalize(email)?;
    let pool = connect().await?;

    let Some((user, hash)) = UserRepository::new(&pool)
        .get_credentials_by_email(&email)
        .await?
    else {
        return Err(UserError::NotFound(email.into_inner()));
    };

    let matches = verify_password(password.expose_secret(), &hash).is_ok();
    tracing::info!(
        "User {} ({}, role {}): password {}",
        user.id,
        user.email,
        user.role,
        if matches { "matches" } else { "does NOT match" }
    );
    if !user.active {
        tracing::warn!("Account is disabled; login would be refused regardless");
    }

    Ok(PasswordCheck {
        matches,
        active: user.active,
    })
}
