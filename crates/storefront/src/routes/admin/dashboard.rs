//! Back-office dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::ProductId;

use crate::db::{
    OrderRepository, ProductRepository, RepositoryError, ReviewRepository, UserRepository,
};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, Product};
use crate::routes::{Page, flash_redirect, store_price};
use crate::state::AppState;

/// Row counts shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counts {
    pub users: i64,
    pub products: i64,
    pub orders: i64,
    pub reviews: i64,
}

/// Stock table row.
#[derive(Clone)]
pub struct StockRow {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub stock_label: String,
    pub low_stock: bool,
}

impl StockRow {
    pub fn new(state: &AppState, product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: store_price(state, product.price),
            stock_label: product.stock_label(),
            low_stock: product.is_low_stock(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: Page,
    pub counts: Counts,
    pub stock: Vec<StockRow>,
}

async fn load(pool: &PgPool) -> Result<(Counts, Vec<Product>), RepositoryError> {
    let user_repo = UserRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let order_repo = OrderRepository::new(pool);
    let review_repo = ReviewRepository::new(pool);
    let (users, products, orders, reviews, all) = tokio::try_join!(
        user_repo.count(),
        product_repo.count(),
        order_repo.count(),
        review_repo.count(),
        product_repo.list_all(),
    )?;
    let counts = Counts {
        users,
        products,
        orders,
        reviews,
    };
    Ok((counts, all))
}

/// Display the dashboard.
#[instrument(skip(state, session))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let (counts, products) = match load(state.pool()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin dashboard");
            return flash_redirect(&session, Flash::error("Could not load the dashboard."), "/")
                .await;
        }
    };

    DashboardTemplate {
        page: Page::load(&session).await,
        counts,
        stock: products.iter().map(|p| StockRow::new(&state, p)).collect(),
    }
    .into_response()
}
