//! Back-office route handlers.
//!
//! Mounted under `/admin`. Every handler takes `RequireAdmin`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                          - Dashboard: counts and stock table
//!
//! # Inventory
//! GET  /admin/inventory                - Product list
//! GET|POST /admin/inventory/new        - Create product
//! GET|POST /admin/inventory/{id}/edit  - Edit product
//! POST /admin/inventory/{id}/delete    - Delete product
//!
//! # Users
//! GET  /admin/users                    - User list
//! POST /admin/users/{id}/role          - Change role
//! POST /admin/users/{id}/active        - Enable or disable
//!
//! # Orders
//! GET  /admin/orders                   - Order list
//! GET  /admin/orders/{id}              - Order detail
//! POST /admin/orders/{id}/status       - Change status
//!
//! # Reviews
//! GET  /admin/reviews                  - Review list
//! POST /admin/reviews/{id}/delete      - Delete review
//!
//! # Analytics
//! GET  /admin/analytics                - Embedded dashboard
//! ```

pub mod analytics;
pub mod dashboard;
pub mod inventory;
pub mod orders;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        // Inventory
        .route("/inventory", get(inventory::index))
        .route(
            "/inventory/new",
            get(inventory::new_page).post(inventory::create),
        )
        .route(
            "/inventory/{id}/edit",
            get(inventory::edit_page).post(inventory::update),
        )
        .route("/inventory/{id}/delete", post(inventory::delete))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/role", post(users::set_role))
        .route("/users/{id}/active", post(users::set_active))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        // Reviews
        .route("/reviews", get(reviews::index))
        .route("/reviews/{id}/delete", post(reviews::delete))
        // Analytics
        .route("/analytics", get(analytics::show))
}
