//! Role and status enums.
//!
//! Both are persisted as plain `TEXT` columns, so conversion goes through
//! [`std::str::FromStr`] / [`std::fmt::Display`] rather than a Postgres enum.

use serde::{Deserialize, Serialize};

/// Coarse access level of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper: catalog prices, cart, checkout, reviews, order history.
    #[default]
    Customer,
    /// Back-office access: inventory, users, orders, reviews, analytics.
    Admin,
}

impl Role {
    /// Value stored in the `users.role` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    /// Returns `true` for back-office accounts.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Order lifecycle status.
///
/// The `orders.status` column is free text: the known values below are what
/// the back-office offers, and anything else read from the database is kept
/// verbatim in [`OrderStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "String", from = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// Statuses an admin may assign.
    pub const KNOWN: [Self; 4] = [Self::Pending, Self::Shipped, Self::Delivered, Self::Cancelled];

    /// Parse a known status (case-insensitive).
    ///
    /// Returns `None` for anything outside [`OrderStatus::KNOWN`].
    #[must_use]
    pub fn parse_known(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Text stored in the database and shown to users.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        Self::parse_known(&s).unwrap_or(Self::Other(s))
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Customer, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_rejects_unknown() {
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_is_case_insensitive() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn test_order_status_known_values() {
        assert_eq!(OrderStatus::parse_known("shipped"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse_known("CANCELED"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse_known("lost"), None);
    }

    #[test]
    fn test_order_status_preserves_unknown_text() {
        let status = OrderStatus::from("Awaiting pickup".to_string());
        assert_eq!(status, OrderStatus::Other("Awaiting pickup".to_string()));
        assert_eq!(status.as_str(), "Awaiting pickup");
    }

    #[test]
    fn test_order_status_serde_as_text() {
        let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
        assert_eq!(json, "\"Delivered\"");
        let parsed: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, OrderStatus::Pending);
    }
}
