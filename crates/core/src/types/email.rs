//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email cannot contain spaces")]
    Whitespace,
    #[error("email must look like name@domain")]
    Malformed,
    #[error("email domain must contain a dot")]
    InvalidDomain,
}

/// A syntactically valid email address.
///
/// Accounts are keyed by the lowercase form produced by [`Email::normalize`];
/// the part before `@` doubles as the generated username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Check an address as given, without trimming or lowercasing.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] when the address is empty, too long,
    /// contains whitespace, does not split into `local@domain` or has a
    /// domain without an inner dot.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::Malformed)?;
        if local.is_empty() || domain.contains('@') {
            return Err(EmailError::Malformed);
        }
        let dotted = domain.contains('.') && domain.split('.').all(|label| !label.is_empty());
        if !dotted {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Parse form input: surrounding whitespace is dropped and the address
    /// lowercased before [`Email::parse`].
    ///
    /// # Errors
    ///
    /// Same as [`Email::parse`].
    pub fn normalize(s: &str) -> Result<Self, EmailError> {
        Self::parse(&s.trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Everything before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_input_is_normalized() {
        let email = Email::normalize("  Ana.Gomez@Ebano.CO\n").unwrap();
        assert_eq!(email.as_str(), "ana.gomez@ebano.co");
        assert_eq!(email.local_part(), "ana.gomez");
    }

    #[test]
    fn test_login_with_different_case_matches_stored_address() {
        let stored = Email::normalize("diego@ebano.co").unwrap();
        assert_eq!(Email::normalize("DIEGO@EBANO.CO ").unwrap(), stored);
    }

    #[test]
    fn test_username_from_tagged_address() {
        let email = Email::normalize("ventas+mayo@tienda.ebano.co").unwrap();
        assert_eq!(email.local_part(), "ventas+mayo");
    }

    #[test]
    fn test_rejects_blank_form_field() {
        assert_eq!(Email::normalize("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_rejects_inner_whitespace() {
        assert_eq!(
            Email::normalize("ana gomez@ebano.co"),
            Err(EmailError::Whitespace)
        );
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for input in ["ebano.co", "@ebano.co", "ana@@ebano.co", "ana@ebano@co.co"] {
            assert_eq!(Email::parse(input), Err(EmailError::Malformed), "{input}");
        }
    }

    #[test]
    fn test_rejects_undotted_domain() {
        for input in ["ana@", "ana@localhost", "ana@ebano.", "ana@.co"] {
            assert_eq!(Email::parse(input), Err(EmailError::InvalidDomain), "{input}");
        }
    }

    #[test]
    fn test_rejects_overlong_address() {
        let input = format!("{}@ebano.co", "a".repeat(250));
        assert_eq!(
            Email::parse(&input),
            Err(EmailError::TooLong { max: Email::MAX_LENGTH })
        );
    }

    #[test]
    fn test_session_json_keeps_plain_string() {
        let email = Email::parse("ana@ebano.co").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ana@ebano.co\"");
        assert_eq!(email.to_string(), "ana@ebano.co");
    }
}
