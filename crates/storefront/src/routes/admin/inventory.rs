//! Inventory management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::{ProductId, parse_amount};

use super::dashboard::StockRow;
use crate::db::{ProductRepository, RepositoryError};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, Product, ProductInput};
use crate::routes::{Page, flash_redirect};
use crate::state::AppState;

/// Product form data. Every field arrives as text.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub stock: String,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            // Exact decimal, never the grouped display form.
            price: product.price.normalize().to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
            stock: product.stock.map(|s| s.to_string()).unwrap_or_default(),
        }
    }

    /// Validate into repository input.
    ///
    /// Blank stock means unlimited.
    fn validate(&self) -> Result<ProductInput, &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required.");
        }

        let price = parse_amount(&self.price);
        if price <= Decimal::ZERO {
            return Err("Price must be greater than zero.");
        }

        let stock = match self.stock.trim() {
            "" => None,
            s => match s.parse::<i32>() {
                Ok(n) if n >= 0 => Some(n),
                Ok(_) => return Err("Stock cannot be negative."),
                Err(_) => return Err("Stock must be a whole number, or blank for unlimited."),
            },
        };

        let optional = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        Ok(ProductInput {
            name: name.to_string(),
            description: optional(&self.description),
            price,
            image_url: optional(&self.image_url),
            stock,
        })
    }
}

/// Inventory list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/inventory/index.html")]
pub struct InventoryTemplate {
    pub page: Page,
    pub products: Vec<StockRow>,
}

/// Product form template, for both create and edit.
#[derive(Template, WebTemplate)]
#[template(path = "admin/inventory/form.html")]
pub struct ProductFormTemplate {
    pub page: Page,
    pub title: String,
    pub action: String,
    pub form: ProductForm,
}

/// List every product.
#[instrument(skip(state, session))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match ProductRepository::new(state.pool()).list_all().await {
        Ok(products) => InventoryTemplate {
            page: Page::load(&session).await,
            products: products.iter().map(|p| StockRow::new(&state, p)).collect(),
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load inventory");
            flash_redirect(&session, Flash::error("Could not load the inventory."), "/admin").await
        }
    }
}

/// Display the empty product form.
#[instrument(skip(session))]
pub async fn new_page(RequireAdmin(_admin): RequireAdmin, session: Session) -> Response {
    ProductFormTemplate {
        page: Page::load(&session).await,
        title: "New product".to_string(),
        action: "/admin/inventory/new".to_string(),
        form: ProductForm::default(),
    }
    .into_response()
}

/// Create a product.
#[instrument(skip(state, session, form))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => {
            let mut page = Page::load(&session).await;
            page.flashes.push(Flash::warning(message));
            return ProductFormTemplate {
                page,
                title: "New product".to_string(),
                action: "/admin/inventory/new".to_string(),
                form,
            }
            .into_response();
        }
    };

    match ProductRepository::new(state.pool()).create(&input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
            add_breadcrumb("admin", "Product created", &[("product_id", product.id.to_string())]);
            flash_redirect(
                &session,
                Flash::success(format!("{} created.", product.name)),
                "/admin/inventory",
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create product");
            flash_redirect(
                &session,
                Flash::error("Could not create the product."),
                "/admin/inventory",
            )
            .await
        }
    }
}

/// Display the form for an existing product.
#[instrument(skip(state, session))]
pub async fn edit_page(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);
    match ProductRepository::new(state.pool()).get_by_id(id).await {
        Ok(Some(product)) => ProductFormTemplate {
            page: Page::load(&session).await,
            title: format!("Edit {}", product.name),
            action: format!("/admin/inventory/{id}/edit"),
            form: ProductForm::from_product(&product),
        }
        .into_response(),
        Ok(None) => {
            flash_redirect(&session, Flash::warning("Product not found."), "/admin/inventory")
                .await
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %id, "Failed to load product");
            flash_redirect(
                &session,
                Flash::error("Could not load the product."),
                "/admin/inventory",
            )
            .await
        }
    }
}

/// Save changes to a product.
#[instrument(skip(state, session, form))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Response {
    let id = ProductId::new(id);
    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => {
            let mut page = Page::load(&session).await;
            page.flashes.push(Flash::warning(message));
            return ProductFormTemplate {
                page,
                title: "Edit product".to_string(),
                action: format!("/admin/inventory/{id}/edit"),
                form,
            }
            .into_response();
        }
    };

    match ProductRepository::new(state.pool()).update(id, &input).await {
        Ok(product) => {
            tracing::info!(product_id = %id, admin_id = %admin.id, "Product updated");
            flash_redirect(
                &session,
                Flash::success(format!("{} updated.", product.name)),
                "/admin/inventory",
            )
            .await
        }
        Err(RepositoryError::NotFound) => {
            flash_redirect(&session, Flash::warning("Product not found."), "/admin/inventory")
                .await
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %id, "Failed to update product");
            flash_redirect(
                &session,
                Flash::error("Could not update the product."),
                "/admin/inventory",
            )
            .await
        }
    }
}

/// Delete a product that no order references.
#[instrument(skip(state, session))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);
    let flash = match ProductRepository::new(state.pool()).delete(id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, admin_id = %admin.id, "Product deleted");
            Flash::success("Product deleted.")
        }
        Err(RepositoryError::NotFound) => Flash::warning("Product not found."),
        Err(RepositoryError::Conflict(_)) => {
            Flash::warning("This product appears in existing orders and cannot be deleted.")
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %id, "Failed to delete product");
            Flash::error("Could not delete the product.")
        }
    };
    flash_redirect(&session, flash, "/admin/inventory").await
}
