//! Order repository for database operations.
//!
//! [`OrderRepository::place`] is the checkout transaction: it locks the
//! ordered product rows, verifies stock for every line, then writes the order
//! header, its lines and the stock decrements. Any failure rolls the whole
//! transaction back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use ebano_core::{OrderId, OrderLineId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{NewOrderLine, Order, OrderDetail, OrderLine};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.user_id, u.full_name AS customer_name, o.placed_at, o.total, o.status
    FROM orders o
    JOIN users u ON u.id = o.user_id
";

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// A line asks for more units than are in stock.
    #[error("insufficient stock for {product}: {available} available")]
    InsufficientStock { product: String, available: i32 },

    /// A product in the order no longer exists.
    #[error("product no longer available: {product}")]
    ProductUnavailable { product: String },

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    customer_name: String,
    placed_at: DateTime<Utc>,
    total: Decimal,
    status: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            customer_name: row.customer_name,
            placed_at: row.placed_at,
            total: row.total,
            status: OrderStatus::from(row.status),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    subtotal: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: row.quantity,
            subtotal: row.subtotal,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    id: i32,
    stock: Option<i32>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.placed_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// One of a customer's orders with its lines.
    ///
    /// Returns `None` when the order does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.id = $1 AND o.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_lines(row.into()).await?)),
            None => Ok(None),
        }
    }

    /// Every order, newest first (back-office).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.placed_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Any order with its lines (back-office).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_lines(row.into()).await?)),
            None => Ok(None),
        }
    }

    async fn with_lines(&self, order: Order) -> Result<OrderDetail, RepositoryError> {
        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT l.id, l.product_id, p.name AS product_name, l.quantity, l.subtotal
            FROM order_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.order_id = $1
            ORDER BY l.id
            ",
        )
        .bind(order.id)
        .fetch_all(self.pool)
        .await?;

        Ok(OrderDetail {
            order,
            lines: lines.into_iter().map(OrderLine::from).collect(),
        })
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Place an order for `user_id` in one transaction.
    ///
    /// Lines are expected to be merged per product. Products with unlimited
    /// (`NULL`) stock always pass the stock check and are not decremented.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::InsufficientStock` if any line exceeds stock.
    /// Returns `PlaceOrderError::ProductUnavailable` if a product was deleted.
    /// Returns `PlaceOrderError::Repository` for database failures or an
    /// empty order.
    pub async fn place(
        &self,
        user_id: UserId,
        lines: &[NewOrderLine],
    ) -> Result<OrderId, PlaceOrderError> {
        if lines.is_empty() {
            return Err(RepositoryError::Conflict("order has no lines".to_owned()).into());
        }

        let mut tx = self.pool.begin().await?;

        let ids: Vec<i32> = lines.iter().map(|l| l.product_id.as_i32()).collect();
        let stock: HashMap<i32, Option<i32>> = sqlx::query_as::<_, StockRow>(
            "SELECT id, stock FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|r| (r.id, r.stock))
        .collect();

        check_stock(lines, &stock)?;

        let total: Decimal = lines.iter().map(NewOrderLine::subtotal).sum();
        let order_id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO orders (user_id, total, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r"
                INSERT INTO order_lines (order_id, product_id, quantity, subtotal)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.subtotal())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock IS NOT NULL",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id, user_id = %user_id, %total, lines = lines.len(), "Order placed");
        Ok(OrderId::new(order_id))
    }
}

/// Verify every line against locked stock levels.
fn check_stock(
    lines: &[NewOrderLine],
    stock: &HashMap<i32, Option<i32>>,
) -> Result<(), PlaceOrderError> {
    for line in lines {
        match stock.get(&line.product_id.as_i32()) {
            None => {
                return Err(PlaceOrderError::ProductUnavailable {
                    product: line.product_name.clone(),
                });
            }
            Some(Some(available)) if line.quantity > *available => {
                return Err(PlaceOrderError::InsufficientStock {
                    product: line.product_name.clone(),
                    available: *available,
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32) -> NewOrderLine {
        NewOrderLine {
            product_id: ProductId::new(id),
            product_name: format!("Producto {id}"),
            quantity,
            unit_price: Decimal::new(1_000, 0),
        }
    }

    #[test]
    fn test_check_stock_passes_unlimited_and_sufficient() {
        let stock = HashMap::from([(1, None), (2, Some(3))]);
        assert!(check_stock(&[line(1, 500), line(2, 3)], &stock).is_ok());
    }

    #[test]
    fn test_check_stock_rejects_excess() {
        let stock = HashMap::from([(1, Some(2))]);
        let err = check_stock(&[line(1, 3)], &stock).unwrap_err();
        assert!(matches!(
            err,
            PlaceOrderError::InsufficientStock { available: 2, .. }
        ));
    }

    #[test]
    fn test_check_stock_rejects_missing_product() {
        let stock = HashMap::from([(1, Some(10))]);
        let err = check_stock(&[line(1, 1), line(2, 1)], &stock).unwrap_err();
        match err {
            PlaceOrderError::ProductUnavailable { product } => assert_eq!(product, "Producto 2"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
