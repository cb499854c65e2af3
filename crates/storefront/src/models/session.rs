//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use ebano_core::{Email, Role, UserId};

use super::user::User;

/// Session-stored user identity.
///
/// The one place the logged-in user lives; role checks read from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Full name shown in the header.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Access level.
    pub role: Role,
}

impl CurrentUser {
    /// Where a freshly logged-in user lands.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        if self.role.is_admin() {
            "/admin"
        } else {
            "/dashboard"
        }
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart lines.
    pub const CART: &str = "cart";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            name: "Ana Gómez".to_string(),
            email: Email::parse("ana@ebano.co").unwrap(),
            role,
        }
    }

    #[test]
    fn test_home_path_by_role() {
        assert_eq!(user(Role::Admin).home_path(), "/admin");
        assert_eq!(user(Role::Customer).home_path(), "/dashboard");
    }

    #[test]
    fn test_session_roundtrip() {
        let current = user(Role::Customer);
        let json = serde_json::to_value(&current).unwrap();
        assert_eq!(json["role"], "customer");
        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, current);
    }
}
