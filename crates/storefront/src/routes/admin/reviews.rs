//! Review moderation route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::ReviewId;

use crate::db::{RepositoryError, ReviewRepository};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, ReviewListing};
use crate::routes::{Page, flash_redirect};
use crate::state::AppState;

/// Review list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reviews.html")]
pub struct ReviewsTemplate {
    pub page: Page,
    pub reviews: Vec<ReviewListing>,
}

/// List every review, newest first.
#[instrument(skip(state, session))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match ReviewRepository::new(state.pool()).list_all().await {
        Ok(reviews) => ReviewsTemplate {
            page: Page::load(&session).await,
            reviews,
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load reviews");
            flash_redirect(&session, Flash::error("Could not load the reviews."), "/admin").await
        }
    }
}

/// Delete any review.
#[instrument(skip(state, session))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ReviewId::new(id);
    let flash = match ReviewRepository::new(state.pool()).delete(id).await {
        Ok(()) => {
            tracing::info!(review_id = %id, admin_id = %admin.id, "Review removed");
            Flash::success("Review deleted.")
        }
        Err(RepositoryError::NotFound) => Flash::warning("Review not found."),
        Err(e) => {
            tracing::error!(error = %e, review_id = %id, "Failed to delete review");
            Flash::error("Could not delete the review.")
        }
    };
    flash_redirect(&session, flash, "/admin/reviews").await
}
