//! Admin account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! EBANO_ADMIN_PASSWORD=... ebano-cli admin create -e admin@example.com -n "Admin Name"
//! ```
//!
//! The first admin has to come from here: registration through the web only
//! creates customers, and only an admin can promote another account.

use ebano_core::Role;
use ebano_storefront::db::UserRepository;
use ebano_storefront::services::auth::validate_registration;
use ebano_storefront::services::{AuthError, Registration};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Registration rules rejected the input.
    #[error("{0}")]
    Invalid(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(#[from] ebano_storefront::db::RepositoryError),
}

impl From<AuthError> for AdminError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Repository(r) => Self::Repository(r),
            other => Self::Invalid(other.user_message()),
        }
    }
}

/// Details for a new admin account.
pub struct NewAdmin {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password: SecretString,
}

/// Create an admin account.
///
/// Applies the same validation as web registration.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `AdminError::UserExists` for a duplicate email and
/// `AdminError::Invalid` for input the registration rules reject.
pub async fn create_user(admin: NewAdmin) -> Result<i32, AdminError> {
    let password = admin.password.expose_secret().to_string();
    let registration = Registration {
        full_name: admin.name,
        email: admin.email,
        password_confirm: password.clone(),
        password,
        phone: admin.phone.unwrap_or_default(),
        address: admin.address.unwrap_or_default(),
    };
    let mut new_user = validate_registration(&registration)?;
    new_user.role = Role::Admin;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if users.email_exists(&new_user.email).await? {
        return Err(AdminError::UserExists(new_user.email.into_inner()));
    }

    tracing::info!("Creating admin user: {}", new_user.email);
    let user = users.create(&new_user).await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id.as_i32())
}
