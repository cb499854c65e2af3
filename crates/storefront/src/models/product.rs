//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ebano_core::ProductId;

/// Stock level at or below which the back-office flags a product.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// A catalog product. Price is in the store currency.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    /// `None` means unlimited stock.
    pub stock: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns `true` if at least one unit can be sold.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }

    /// Returns `true` for finite stock at or below [`LOW_STOCK_THRESHOLD`].
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.stock.is_some_and(|s| s <= LOW_STOCK_THRESHOLD)
    }

    /// Stock as shown to admins.
    #[must_use]
    pub fn stock_label(&self) -> String {
        self.stock
            .map_or_else(|| "Unlimited".to_string(), |s| s.to_string())
    }
}

/// Back-office create/update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: Option<i32>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Café de origen".to_string(),
            description: None,
            price: Decimal::new(42_000, 0),
            image_url: None,
            stock,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unlimited_stock() {
        let p = product(None);
        assert!(p.in_stock());
        assert!(!p.is_low_stock());
        assert_eq!(p.stock_label(), "Unlimited");
    }

    #[test]
    fn test_low_and_empty_stock() {
        assert!(product(Some(5)).is_low_stock());
        assert!(!product(Some(6)).is_low_stock());
        assert!(!product(Some(0)).in_stock());
        assert!(product(Some(1)).in_stock());
    }
}
