//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::Page;
use super::products::{ProductCard, product_cards};
use crate::db::ProductRepository;
use crate::filters;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_COUNT: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub featured: Vec<ProductCard>,
}

/// Display the home page with a few in-stock products.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let mut products = ProductRepository::new(state.pool())
        .list_all()
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load featured products");
            Vec::new()
        });
    products.retain(crate::models::Product::in_stock);
    products.truncate(FEATURED_COUNT);

    let page = Page::load(&session).await;
    let featured = product_cards(&state, &page, &products).await;
    HomeTemplate { page, featured }
}
