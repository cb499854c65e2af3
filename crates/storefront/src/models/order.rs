//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use ebano_core::{OrderId, OrderLineId, OrderStatus, ProductId, UserId};

/// An order header.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Name of the customer who placed it.
    pub customer_name: String,
    pub placed_at: DateTime<Utc>,
    /// Total in the store currency.
    pub total: Decimal,
    pub status: OrderStatus,
}

/// A line snapshot: quantity and subtotal as they were at checkout.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// An order with its lines.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// One line of an order about to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Price per unit when the line was added to the cart.
    pub unit_price: Decimal,
}

impl NewOrderLine {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
