//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::ProductId;

use super::{Page, flash_redirect, prices_for};
use crate::db::{ProductRepository, ReviewRepository};
use crate::error::report_error;
use crate::filters;
use crate::models::{Flash, Product, ReviewListing, flash};
use crate::state::AppState;

/// Shown in place of the products when the catalog cannot be read.
const CATALOG_UNAVAILABLE: &str = "Could not load the products. Please try again.";

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    /// `None` when prices are hidden from the viewer.
    pub price: Option<String>,
    pub stock_label: String,
    pub in_stock: bool,
    pub low_stock: bool,
}

impl ProductCard {
    fn new(product: &Product, price: Option<String>) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            image_url: product.image_url.clone(),
            price,
            stock_label: product.stock_label(),
            in_stock: product.in_stock(),
            low_stock: product.is_low_stock(),
        }
    }
}

/// Build cards for `products`, pricing them for the page's viewer.
pub async fn product_cards(state: &AppState, page: &Page, products: &[Product]) -> Vec<ProductCard> {
    let amounts: Vec<_> = products.iter().map(|p| p.price).collect();
    let prices = prices_for(state, page.user.as_ref(), &amounts).await;

    products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let price = prices.as_ref().and_then(|ps| ps.get(i).cloned());
            ProductCard::new(p, price)
        })
        .collect()
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/catalog.html")]
pub struct CatalogTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductCard,
    pub reviews: Vec<ReviewListing>,
}

/// Every product, or none with an error flash if the query fails.
async fn load_catalog(pool: &PgPool, session: &Session) -> Vec<Product> {
    match ProductRepository::new(pool).list_all().await {
        Ok(products) => products,
        Err(e) => {
            report_error(&e, "Failed to load catalog");
            flash::push(session, Flash::error(CATALOG_UNAVAILABLE)).await;
            Vec::new()
        }
    }
}

/// Display every product.
#[instrument(skip(state, session))]
pub async fn catalog(State(state): State<AppState>, session: Session) -> CatalogTemplate {
    let products = load_catalog(state.pool(), &session).await;

    let page = Page::load(&session).await;
    let products = product_cards(&state, &page, &products).await;
    CatalogTemplate { page, products }
}

/// Display one product with its reviews.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);
    let product = match ProductRepository::new(state.pool()).get_by_id(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Product not found."), "/catalog")
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %id, "Failed to load product");
            return flash_redirect(
                &session,
                Flash::error("Could not load the product."),
                "/catalog",
            )
            .await;
        }
    };

    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(id)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, product_id = %id, "Failed to load reviews");
            Vec::new()
        });

    let page = Page::load(&session).await;
    let product = product_cards(&state, &page, std::slice::from_ref(&product))
        .await
        .into_iter()
        .next()
        .unwrap_or_else(|| ProductCard::new(&product, None));

    ProductShowTemplate {
        page,
        product,
        reviews,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_unreachable_catalog_flashes_and_lists_nothing() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://ebano@127.0.0.1:1/ebano")
            .unwrap();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        let products = load_catalog(&pool, &session).await;

        assert!(products.is_empty());
        let flashes = flash::take(&session).await;
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].message, CATALOG_UNAVAILABLE);
    }
}
