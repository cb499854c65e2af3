//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /catalog                   - Product listing
//! GET  /products/{id}             - Product detail with reviews
//!
//! # Auth
//! GET  /login, POST /login        - Login (POST rate limited)
//! GET  /register, POST /register  - Registration (POST rate limited)
//! POST /logout                    - Logout
//!
//! # Cart (requires login to add)
//! GET  /cart, POST /cart          - Cart page, quantity update
//! POST /cart/add/{id}             - Add product
//! POST /cart/clear                - Empty the cart
//!
//! # Checkout (requires login)
//! GET  /checkout, POST /checkout  - Review and place order
//! GET  /checkout/success          - Confirmation
//!
//! # Customer area (requires customer role)
//! GET  /dashboard                 - Overview
//! GET  /orders, /orders/{id}      - Order history and detail
//! GET  /profile, POST /profile    - Profile
//! GET|POST /profile/password      - Change password
//! GET  /reviews                   - Own reviews
//! GET|POST /reviews/new/{product} - Write a review
//! GET|POST /reviews/{id}/edit     - Edit own review
//! POST /reviews/{id}/delete       - Delete own review
//!
//! # Back-office (requires admin role)
//! /admin/...                      - See `admin`
//!
//! # API
//! GET  /api/rate                  - Cached exchange rate (JSON)
//! ```

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use tower_sessions::Session;

use ebano_core::{Role, format_store_amount};

use crate::middleware::{auth_rate_limiter, current_user};
use crate::models::{Cart, CurrentUser, Flash, flash};
use crate::state::AppState;

// =============================================================================
// Shared page context
// =============================================================================

/// Data every full page needs: who is logged in, pending flash messages,
/// and the cart badge count.
pub struct Page {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub cart_count: i64,
}

impl Page {
    /// Load the page context. Drains pending flash messages.
    pub async fn load(session: &Session) -> Self {
        Self {
            user: current_user(session).await,
            flashes: flash::take(session).await,
            cart_count: Cart::load(session).await.item_count(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_admin())
    }

    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == Role::Customer)
    }
}

/// Queue a flash message and redirect.
pub async fn flash_redirect(session: &Session, message: Flash, to: &str) -> Response {
    flash::push(session, message).await;
    Redirect::to(to).into_response()
}

/// Format store-currency amounts for a viewer.
///
/// Guests see no prices, admins see store-currency amounts, customers see
/// the display currency.
pub async fn prices_for(
    state: &AppState,
    viewer: Option<&CurrentUser>,
    amounts: &[Decimal],
) -> Option<Vec<String>> {
    let viewer = viewer?;
    if viewer.role.is_admin() {
        return Some(amounts.iter().map(|a| store_price(state, *a)).collect());
    }
    Some(state.rates().display_prices(amounts).await)
}

/// Format an amount in the store currency, e.g. `42.000 COP`.
#[must_use]
pub fn store_price(state: &AppState, amount: Decimal) -> String {
    format!(
        "{} {}",
        format_store_amount(amount),
        state.config().currency.store_currency
    )
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
///
/// Only the credential POSTs are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).post(cart::update))
        .route("/cart/add/{id}", post(cart::add))
        .route("/cart/clear", post(cart::clear))
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/checkout/success", get(checkout::success))
}

/// Create the customer area routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(account::dashboard))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order_detail))
        .route(
            "/profile",
            get(account::profile_page).post(account::update_profile),
        )
        .route(
            "/profile/password",
            get(account::password_page).post(account::change_password),
        )
        .route("/reviews", get(reviews::index))
        .route(
            "/reviews/new/{product_id}",
            get(reviews::new_page).post(reviews::create),
        )
        .route(
            "/reviews/{id}/edit",
            get(reviews::edit_page).post(reviews::update),
        )
        .route("/reviews/{id}/delete", post(reviews::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/catalog", get(products::catalog))
        .route("/products/{id}", get(products::show))
        .route("/api/rate", get(api::rate))
        .merge(auth_routes())
        .merge(cart_routes())
        .merge(account_routes())
        .nest("/admin", admin::routes())
}
