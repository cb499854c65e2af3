//! Session-held shopping cart.
//!
//! The cart is a list of lines keyed by product ID, serialized into the
//! session under [`keys::CART`]. Each line snapshots the product's name and
//! unit price at the moment it was added; checkout charges that snapshot.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use ebano_core::ProductId;

use super::order::NewOrderLine;
use super::product::Product;
use super::session::keys;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Store-currency price per unit.
    pub unit_price: Decimal,
    pub image_url: Option<String>,
    pub quantity: i32,
}

impl CartLine {
    /// A line for `quantity` units of `product`.
    #[must_use]
    pub fn for_product(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_url: product.image_url.clone(),
            quantity,
        }
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Result of checking a requested quantity against stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    /// The full quantity can be added.
    Available(i32),
    /// Only `available` units exist; the quantity was reduced to that.
    Clamped { available: i32 },
    /// Nothing left to sell.
    OutOfStock,
}

/// Normalize a requested quantity and check it against stock.
///
/// Quantities below one become one. `None` stock is unlimited.
#[must_use]
pub fn check_stock(requested: i32, stock: Option<i32>) -> StockCheck {
    let quantity = requested.max(1);
    match stock {
        None => StockCheck::Available(quantity),
        Some(s) if s <= 0 => StockCheck::OutOfStock,
        Some(s) if quantity > s => StockCheck::Clamped { available: s },
        Some(_) => StockCheck::Available(quantity),
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Load the cart from the session (empty when absent or unreadable).
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(keys::CART).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart from session");
                Self::default()
            }
        }
    }

    /// Store the cart in the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::CART, self).await
    }

    /// Remove the cart from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn clear(session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.remove::<Self>(keys::CART).await.map(|_| ())
    }

    /// Add a line, merging with an existing line for the same product.
    pub fn add(&mut self, line: CartLine) {
        let quantity = line.quantity.max(1);
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine { quantity, ..line });
        }
    }

    /// Apply `qty_{product_id}` form fields.
    ///
    /// Unparsable values leave the line untouched; zero or less removes it.
    /// Returns `true` if any line was updated.
    pub fn apply_quantities(&mut self, form: &HashMap<String, String>) -> bool {
        let mut changed = false;
        for line in &mut self.lines {
            let key = format!("qty_{}", line.product_id);
            if let Some(quantity) = form.get(&key).and_then(|v| v.trim().parse::<i32>().ok()) {
                line.quantity = quantity.max(0);
                changed = true;
            }
        }
        self.lines.retain(|l| l.quantity > 0);
        changed
    }

    /// Sum of unit price times quantity, in the store currency.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Lines in the shape checkout writes.
    #[must_use]
    pub fn to_order_lines(&self) -> Vec<NewOrderLine> {
        self.lines
            .iter()
            .map(|l| NewOrderLine {
                product_id: l.product_id,
                product_name: l.name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn line(id: i32, price: i64, quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Producto {id}"),
            unit_price: Decimal::new(price, 0),
            image_url: None,
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::default();
        cart.add(line(1, 42_000, 2));
        cart.add(line(2, 10_000, 1));
        cart.add(line(1, 42_000, 3));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_floors_quantity_at_one() {
        let mut cart = Cart::default();
        cart.add(line(1, 100, 0));
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_total() {
        let mut cart = Cart::default();
        cart.add(line(1, 42_000, 2));
        cart.add(line(2, 10_500, 1));
        assert_eq!(cart.total(), Decimal::new(94_500, 0));
        assert_eq!(Cart::default().total(), Decimal::ZERO);
    }

    #[test]
    fn test_check_stock() {
        assert_eq!(check_stock(3, None), StockCheck::Available(3));
        assert_eq!(check_stock(-2, None), StockCheck::Available(1));
        assert_eq!(check_stock(1, Some(0)), StockCheck::OutOfStock);
        assert_eq!(check_stock(1, Some(-1)), StockCheck::OutOfStock);
        assert_eq!(check_stock(10, Some(4)), StockCheck::Clamped { available: 4 });
        assert_eq!(check_stock(4, Some(4)), StockCheck::Available(4));
    }

    #[test]
    fn test_apply_quantities() {
        let mut cart = Cart::default();
        cart.add(line(1, 100, 1));
        cart.add(line(2, 100, 1));
        cart.add(line(3, 100, 1));

        let form: HashMap<String, String> = [
            ("qty_1".to_string(), "4".to_string()),
            ("qty_2".to_string(), "0".to_string()),
            ("qty_3".to_string(), "lots".to_string()),
        ]
        .into_iter()
        .collect();

        assert!(cart.apply_quantities(&form));
        let quantities: Vec<(i32, i32)> = cart
            .lines()
            .iter()
            .map(|l| (l.product_id.as_i32(), l.quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 4), (3, 1)]);
    }

    #[test]
    fn test_apply_quantities_without_fields_is_unchanged() {
        let mut cart = Cart::default();
        cart.add(line(1, 100, 2));
        assert!(!cart.apply_quantities(&HashMap::new()));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_to_order_lines_snapshots_price() {
        let mut cart = Cart::default();
        cart.add(line(9, 1_500, 3));
        let lines = cart.to_order_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].subtotal(), Decimal::new(4_500, 0));
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(Cart::load(&session).await.is_empty());

        let mut cart = Cart::default();
        cart.add(line(1, 100, 2));
        cart.save(&session).await.unwrap();
        assert_eq!(Cart::load(&session).await, cart);

        Cart::clear(&session).await.unwrap();
        assert!(Cart::load(&session).await.is_empty());
    }
}
