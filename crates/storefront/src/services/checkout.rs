//! Checkout: turns the session cart into an order.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use ebano_core::{OrderId, UserId};

use crate::db::{OrderRepository, PlaceOrderError, RepositoryError};
use crate::models::Cart;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The order could not be placed.
    #[error(transparent)]
    Order(#[from] PlaceOrderError),
}

impl CheckoutError {
    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::Order(PlaceOrderError::InsufficientStock { product, available }) => {
                format!("Not enough stock of {product}. Available: {available}.")
            }
            Self::Order(PlaceOrderError::ProductUnavailable { product }) => {
                format!("{product} is no longer available. Remove it from your cart to continue.")
            }
            Self::Order(PlaceOrderError::Repository(_)) => {
                "There was an error processing your order. Please try again.".to_string()
            }
        }
    }

    /// Whether the failure is a server-side fault rather than a cart problem.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Order(PlaceOrderError::Repository(_)))
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Place an order for the cart's lines at their snapshotted prices.
    ///
    /// The caller clears the cart after success.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart, otherwise the
    /// stock or database failure from the order transaction.
    #[instrument(skip(self, cart), fields(user_id = %user_id, items = cart.item_count()))]
    pub async fn place_order(&self, user_id: UserId, cart: &Cart) -> Result<OrderId, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(self.orders.place(user_id, &cart.to_order_lines()).await?)
    }
}
