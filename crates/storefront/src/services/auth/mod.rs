//! Authentication service.
//!
//! Provides password registration, login and password changes. Accounts are
//! keyed by normalized email; passwords are stored as Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use ebano_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, User};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const NAME_LENGTH: (usize, usize) = (3, 150);
const PHONE_LENGTH: (usize, usize) = (7, 50);
const MIN_ADDRESS_LENGTH: usize = 5;

/// Raw registration form values.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub phone: String,
    pub address: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidField`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` if the form fails validation.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let new_user = validate_registration(form)?;

        if self.users.email_exists(&new_user.email).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        // The unique index still guards against a concurrent registration.
        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong
    /// password, and `AuthError::AccountDisabled` for a deactivated account.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::normalize(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }

    /// Change a user's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if the new password is too short or
    /// does not match its confirmation.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .users
            .get_password_hash(user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        verify_password(current, &stored)?;

        validate_password(new_password, confirm)?;
        let hash = hash_password(new_password)?;
        self.users.update_password_hash(user_id, &hash).await?;
        Ok(())
    }
}

/// Validate a registration form into a ready-to-insert customer.
///
/// # Errors
///
/// Returns the first failing rule as an `AuthError`.
pub fn validate_registration(form: &Registration) -> Result<NewUser, AuthError> {
    let full_name = form.full_name.trim();
    check_length("Full name", full_name, NAME_LENGTH.0, Some(NAME_LENGTH.1))?;

    let email = Email::normalize(&form.email)?;
    validate_password(&form.password, &form.password_confirm)?;

    let phone = form.phone.trim();
    check_length("Phone", phone, PHONE_LENGTH.0, Some(PHONE_LENGTH.1))?;

    let address = form.address.trim();
    check_length("Address", address, MIN_ADDRESS_LENGTH, None)?;

    Ok(NewUser {
        username: email.local_part().to_string(),
        full_name: full_name.to_string(),
        email,
        password_hash: hash_password(&form.password)?,
        role: Role::Customer,
        phone: Some(phone.to_string()),
        address: Some(address.to_string()),
    })
}

fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) -> Result<(), AuthError> {
    let len = value.chars().count();
    match max {
        Some(max) if !(min..=max).contains(&len) => Err(AuthError::InvalidField(format!(
            "{field} must be between {min} and {max} characters."
        ))),
        None if len < min => Err(AuthError::InvalidField(format!(
            "{field} must be at least {min} characters."
        ))),
        _ => Ok(()),
    }
}

/// Validate a new password and its confirmation.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short or the
/// confirmation differs.
pub fn validate_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    if password != confirm {
        return Err(AuthError::WeakPassword("Passwords do not match.".to_string()));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match or
/// the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> Registration {
        Registration {
            full_name: "  Ana Gómez ".to_string(),
            email: " Ana.Gomez@Ebano.CO ".to_string(),
            password: "cafe123".to_string(),
            password_confirm: "cafe123".to_string(),
            phone: "3001234567".to_string(),
            address: "Calle 10 # 5-20, Medellín".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let user = validate_registration(&form()).unwrap();
        assert_eq!(user.full_name, "Ana Gómez");
        assert_eq!(user.email.as_str(), "ana.gomez@ebano.co");
        assert_eq!(user.username, "ana.gomez");
        assert_eq!(user.role, Role::Customer);
        assert!(verify_password("cafe123", &user.password_hash).is_ok());
    }

    #[test]
    fn test_registration_rejects_short_name() {
        let mut f = form();
        f.full_name = "Al".to_string();
        assert!(matches!(
            validate_registration(&f),
            Err(AuthError::InvalidField(_))
        ));
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let mut f = form();
        f.email = "not-an-email".to_string();
        assert!(matches!(
            validate_registration(&f),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_registration_rejects_mismatched_confirmation() {
        let mut f = form();
        f.password_confirm = "cafe124".to_string();
        assert!(matches!(
            validate_registration(&f),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_registration_rejects_short_phone_and_address() {
        let mut f = form();
        f.phone = "12345".to_string();
        assert!(validate_registration(&f).is_err());

        let mut f = form();
        f.address = "Cra".to_string();
        assert!(validate_registration(&f).is_err());
    }

    #[test]
    fn test_password_length_boundary() {
        assert!(validate_password("12345", "12345").is_err());
        assert!(validate_password("123456", "123456").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_foreign_hash() {
        // bcrypt hashes from older installs are not accepted
        let bcrypt = "$2b$12$KIXQJ1sXoE5sQ9k2u7CwUe4m5r1pJ6fJ8vZl0nW3aYt7bQ1xH9y2e";
        assert!(verify_password("anything", bcrypt).is_err());
    }

    #[test]
    fn test_user_messages_do_not_leak_details() {
        let msg = AuthError::Repository(RepositoryError::NotFound).user_message();
        assert!(!msg.contains("database"));
        assert_eq!(
            AuthError::UserNotFound.user_message(),
            AuthError::InvalidCredentials.user_message()
        );
    }
}
