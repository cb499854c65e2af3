//! Cart route handlers.
//!
//! The cart lives entirely in the session. Adding requires a login so that
//! stock is only reserved by people who can check out; viewing and editing
//! work for anyone holding a session.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::ProductId;

use super::{Page, flash_redirect, prices_for};
use crate::db::ProductRepository;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::cart::{StockCheck, check_stock};
use crate::models::{Cart, CartLine, Flash, flash};
use crate::state::AppState;

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default = "default_quantity")]
    pub quantity: String,
}

fn default_quantity() -> String {
    "1".to_string()
}

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<String>,
    pub subtotal: Option<String>,
}

/// Priced cart contents for templates.
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Option<String>,
    pub item_count: i64,
}

impl CartView {
    /// Price every line and the total for the page's viewer.
    pub async fn build(state: &AppState, page: &Page, cart: &Cart) -> Self {
        let lines = cart.lines();
        let mut amounts: Vec<_> = lines.iter().map(|l| l.unit_price).collect();
        amounts.extend(lines.iter().map(CartLine::subtotal));
        amounts.push(cart.total());

        let prices = prices_for(state, page.user.as_ref(), &amounts).await;
        let price_at = |i: usize| prices.as_ref().and_then(|p| p.get(i).cloned());

        let views = lines
            .iter()
            .enumerate()
            .map(|(i, l)| CartLineView {
                product_id: l.product_id,
                name: l.name.clone(),
                image_url: l.image_url.clone(),
                quantity: l.quantity,
                unit_price: price_at(i),
                subtotal: price_at(lines.len() + i),
            })
            .collect();

        Self {
            lines: views,
            total: price_at(lines.len() * 2),
            item_count: cart.item_count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: Page,
    pub cart: CartView,
}

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let cart = Cart::load(&session).await;
    let page = Page::load(&session).await;
    let cart = CartView::build(&state, &page, &cart).await;
    CartShowTemplate { page, cart }
}

/// Apply the `qty_{id}` fields of the cart form.
#[instrument(skip(session, form))]
pub async fn update(session: Session, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut cart = Cart::load(&session).await;
    if !cart.apply_quantities(&form) {
        return Redirect::to("/cart").into_response();
    }

    if let Err(e) = cart.save(&session).await {
        tracing::error!(error = %e, "Failed to save cart");
        return flash_redirect(&session, Flash::error("Could not update the cart."), "/cart")
            .await;
    }
    flash_redirect(&session, Flash::success("Cart updated."), "/cart").await
}

/// Add a product to the cart, clamped to available stock.
#[instrument(skip(state, session, form))]
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let id = ProductId::new(id);
    let product = match ProductRepository::new(state.pool()).get_by_id(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Product not found."), "/catalog")
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %id, "Failed to load product for cart");
            return flash_redirect(
                &session,
                Flash::error("Could not add the product."),
                "/catalog",
            )
            .await;
        }
    };

    // Unparsable input counts as one unit.
    let requested = form.quantity.trim().parse::<i32>().unwrap_or(1);
    let mut cart = Cart::load(&session).await;
    let already = cart
        .lines()
        .iter()
        .find(|l| l.product_id == id)
        .map_or(0, |l| l.quantity);
    let remaining = product.stock.map(|s| s.saturating_sub(already));

    let quantity = match check_stock(requested, remaining) {
        StockCheck::Available(q) => q,
        StockCheck::Clamped { available } => {
            flash::push(
                &session,
                Flash::warning(format!(
                    "Only {available} more of {} available; quantity adjusted.",
                    product.name
                )),
            )
            .await;
            available
        }
        StockCheck::OutOfStock => {
            let back = format!("/products/{id}");
            return flash_redirect(
                &session,
                Flash::warning(format!("{} is out of stock.", product.name)),
                &back,
            )
            .await;
        }
    };

    cart.add(CartLine::for_product(&product, quantity));
    if let Err(e) = cart.save(&session).await {
        tracing::error!(error = %e, "Failed to save cart");
        return flash_redirect(&session, Flash::error("Could not add the product."), "/catalog")
            .await;
    }

    add_breadcrumb(
        "cart",
        "Product added",
        &[
            ("user_id", user.id.to_string()),
            ("product_id", id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );
    flash_redirect(
        &session,
        Flash::success(format!("{quantity} x {} added to the cart.", product.name)),
        "/cart",
    )
    .await
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Response {
    if let Err(e) = Cart::clear(&session).await {
        tracing::error!(error = %e, "Failed to clear cart");
        return flash_redirect(&session, Flash::error("Could not empty the cart."), "/cart")
            .await;
    }
    flash_redirect(&session, Flash::info("Cart emptied."), "/cart").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_form_defaults_to_one() {
        let form: AddToCartForm = serde_json::from_str("{}").unwrap();
        assert_eq!(form.quantity, "1");
    }

    #[test]
    fn test_add_form_reads_quantity() {
        let form: AddToCartForm = serde_json::from_str(r#"{"quantity":"3"}"#).unwrap();
        assert_eq!(form.quantity, "3");
    }
}
