//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use ebano_core::{Email, Role, UserId};

/// A storefront account (customer or admin).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login handle, derived from the email's local part.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Normalized email address.
    pub email: Email,
    /// Access level.
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    /// Deactivated accounts cannot log in.
    pub active: bool,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Editable profile fields.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
}
