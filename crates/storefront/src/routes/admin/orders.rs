//! Order management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, Order, OrderLine};
use crate::routes::{Page, flash_redirect, store_price};
use crate::state::AppState;

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Order row for templates.
#[derive(Clone)]
pub struct AdminOrderView {
    pub id: OrderId,
    pub customer_name: String,
    pub placed_at: String,
    pub total: String,
    pub status: String,
}

impl AdminOrderView {
    fn new(state: &AppState, order: &Order) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name.clone(),
            placed_at: order.placed_at.format("%Y-%m-%d %H:%M").to_string(),
            total: store_price(state, order.total),
            status: order.status.to_string(),
        }
    }
}

/// Order line row for templates.
#[derive(Clone)]
pub struct AdminOrderLineView {
    pub product_name: String,
    pub quantity: i32,
    pub subtotal: String,
}

impl AdminOrderLineView {
    fn new(state: &AppState, line: &OrderLine) -> Self {
        Self {
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            subtotal: store_price(state, line.subtotal),
        }
    }
}

/// A status choice in the status form.
#[derive(Clone)]
pub struct StatusOption {
    pub value: String,
    pub selected: bool,
}

/// Order list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<AdminOrderView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/show.html")]
pub struct OrderShowTemplate {
    pub page: Page,
    pub order: AdminOrderView,
    pub lines: Vec<AdminOrderLineView>,
    pub statuses: Vec<StatusOption>,
}

/// The assignable statuses, with `current` selected.
fn status_options(current: &OrderStatus) -> Vec<StatusOption> {
    OrderStatus::KNOWN
        .iter()
        .map(|s| StatusOption {
            value: s.as_str().to_string(),
            selected: s == current,
        })
        .collect()
}

/// List every order, newest first.
#[instrument(skip(state, session))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match OrderRepository::new(state.pool()).list_all().await {
        Ok(orders) => OrdersTemplate {
            page: Page::load(&session).await,
            orders: orders.iter().map(|o| AdminOrderView::new(&state, o)).collect(),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load orders");
            flash_redirect(&session, Flash::error("Could not load the orders."), "/admin").await
        }
    }
}

/// Display one order with its lines.
#[instrument(skip(state, session))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = OrderId::new(id);
    match OrderRepository::new(state.pool()).get_by_id(id).await {
        Ok(Some(detail)) => OrderShowTemplate {
            page: Page::load(&session).await,
            order: AdminOrderView::new(&state, &detail.order),
            lines: detail
                .lines
                .iter()
                .map(|l| AdminOrderLineView::new(&state, l))
                .collect(),
            statuses: status_options(&detail.order.status),
        }
        .into_response(),
        Ok(None) => {
            flash_redirect(&session, Flash::warning("Order not found."), "/admin/orders").await
        }
        Err(e) => {
            tracing::error!(error = %e, order_id = %id, "Failed to load order");
            flash_redirect(&session, Flash::error("Could not load the order."), "/admin/orders")
                .await
        }
    }
}

/// Change an order's status to one of the known values.
#[instrument(skip(state, session))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Response {
    let id = OrderId::new(id);
    let back = format!("/admin/orders/{id}");

    let Some(status) = OrderStatus::parse_known(&form.status) else {
        return flash_redirect(&session, Flash::warning("Unknown order status."), &back).await;
    };

    let flash = match OrderRepository::new(state.pool())
        .update_status(id, &status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, status = %status, admin_id = %admin.id, "Order status changed");
            Flash::success(format!("Order marked {status}."))
        }
        Err(RepositoryError::NotFound) => Flash::warning("Order not found."),
        Err(e) => {
            tracing::error!(error = %e, order_id = %id, "Failed to change order status");
            Flash::error("Could not update the order.")
        }
    };
    flash_redirect(&session, flash, &back).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_options() {
        let options = status_options(&OrderStatus::Shipped);
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["Pending", "Shipped", "Delivered", "Cancelled"]);

        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert!(selected.iter().all(|o| o.value == "Shipped"));
    }

    #[test]
    fn test_unknown_status_selects_nothing() {
        let options = status_options(&OrderStatus::Other("On hold".to_string()));
        assert!(options.iter().all(|o| !o.selected));
    }
}
