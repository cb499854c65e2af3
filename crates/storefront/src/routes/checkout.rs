//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use super::{Page, flash_redirect};
use crate::error::{add_breadcrumb, report_error};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Cart, Flash};
use crate::services::{CheckoutError, CheckoutService};
use crate::state::AppState;

/// Checkout review template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub page: Page,
}

/// Review the cart before placing the order.
#[instrument(skip(state, session))]
pub async fn show(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let cart = Cart::load(&session).await;
    if cart.is_empty() {
        return flash_redirect(&session, Flash::info("Your cart is empty."), "/catalog").await;
    }

    let page = Page::load(&session).await;
    let cart = CartView::build(&state, &page, &cart).await;
    CheckoutTemplate { page, cart }.into_response()
}

/// Place the order for the session cart.
#[instrument(skip(state, session), fields(user_id = tracing::field::Empty))]
pub async fn place(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    tracing::Span::current().record("user_id", user.id.as_i32());

    let cart = Cart::load(&session).await;
    match CheckoutService::new(state.pool())
        .place_order(user.id, &cart)
        .await
    {
        Ok(order_id) => {
            if let Err(e) = Cart::clear(&session).await {
                tracing::error!(error = %e, order_id = %order_id, "Failed to clear cart after order");
            }
            add_breadcrumb("checkout", "Order placed", &[("order_id", order_id.to_string())]);
            tracing::info!(order_id = %order_id, "Order placed");
            flash_redirect(
                &session,
                Flash::success(format!("Order #{order_id} placed.")),
                "/checkout/success",
            )
            .await
        }
        Err(CheckoutError::EmptyCart) => {
            flash_redirect(
                &session,
                Flash::info(CheckoutError::EmptyCart.user_message()),
                "/catalog",
            )
            .await
        }
        Err(e) => {
            if e.is_server_error() {
                report_error(&e, "Checkout failed");
            } else {
                tracing::info!(reason = %e, "Checkout rejected");
            }
            flash_redirect(&session, Flash::error(e.user_message()), "/cart").await
        }
    }
}

/// Order confirmation page.
#[instrument(skip(session))]
pub async fn success(RequireAuth(_user): RequireAuth, session: Session) -> impl IntoResponse {
    CheckoutSuccessTemplate {
        page: Page::load(&session).await,
    }
}
