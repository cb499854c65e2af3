//! Review route handlers (customers only).
//!
//! A customer holds at most one review per product. Asking to write a
//! second one lands on the edit form for the first.

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

use ebano_core::{ProductId, Rating, ReviewId};

use super::{Page, flash_redirect};
use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::filters;
use crate::middleware::RequireCustomer;
use crate::models::{CurrentUser, Flash, Product, Review, ReviewInput, ReviewListing};
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub comment: String,
    pub rating: String,
}

/// Own reviews template.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsTemplate {
    pub page: Page,
    pub reviews: Vec<ReviewListing>,
}

/// A rating choice in the review form.
#[derive(Clone, Copy)]
pub struct RatingOption {
    pub value: i32,
    pub selected: bool,
}

/// Review form template, for both writing and editing.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/form.html")]
pub struct ReviewFormTemplate {
    pub page: Page,
    pub product_name: String,
    pub action: String,
    pub comment: String,
    pub ratings: Vec<RatingOption>,
}

impl ReviewFormTemplate {
    fn new(page: Page, product: &Product, action: String, review: Option<&Review>) -> Self {
        Self {
            page,
            product_name: product.name.clone(),
            action,
            comment: review.map(|r| r.comment.clone()).unwrap_or_default(),
            ratings: rating_options(review.map_or(Rating::MAX, |r| r.rating.value())),
        }
    }
}

/// Rating choices from best to worst, with `current` selected.
fn rating_options(current: i32) -> Vec<RatingOption> {
    (Rating::MIN..=Rating::MAX)
        .rev()
        .map(|value| RatingOption {
            value,
            selected: value == current,
        })
        .collect()
}

async fn load_product(state: &AppState, id: ProductId) -> Result<Option<Product>, RepositoryError> {
    ProductRepository::new(state.pool()).get_by_id(id).await
}

/// List the customer's reviews.
#[instrument(skip(state, session))]
pub async fn index(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match ReviewRepository::new(state.pool()).list_for_user(user.id).await {
        Ok(reviews) => ReviewsTemplate {
            page: Page::load(&session).await,
            reviews,
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load reviews");
            flash_redirect(
                &session,
                Flash::error("Could not load your reviews."),
                "/dashboard",
            )
            .await
        }
    }
}

/// Display the form for a new review.
#[instrument(skip(state, session))]
pub async fn new_page(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<i32>,
) -> Response {
    let product_id = ProductId::new(product_id);
    let product = match load_product(&state, product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Product not found."), "/catalog")
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            return flash_redirect(&session, Flash::error("Could not load the product."), "/catalog")
                .await;
        }
    };

    match ReviewRepository::new(state.pool())
        .exists_for(user.id, product_id)
        .await
    {
        Ok(Some(existing)) => {
            let to = format!("/reviews/{existing}/edit");
            flash_redirect(
                &session,
                Flash::info("You already reviewed this product; edit your review instead."),
                &to,
            )
            .await
        }
        Ok(None) => {
            let action = format!("/reviews/new/{product_id}");
            ReviewFormTemplate::new(Page::load(&session).await, &product, action, None)
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to check for an existing review");
            flash_redirect(&session, Flash::error("Could not open the review form."), "/reviews")
                .await
        }
    }
}

/// Save a new review.
#[instrument(skip(state, session, form))]
pub async fn create(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let product_id = ProductId::new(product_id);
    let back = format!("/reviews/new/{product_id}");

    match load_product(&state, product_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Product not found."), "/catalog")
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            return flash_redirect(&session, Flash::error("Could not save the review."), &back)
                .await;
        }
    }

    let input = match ReviewInput::parse(&form.comment, &form.rating) {
        Ok(input) => input,
        Err(e) => return flash_redirect(&session, Flash::warning(e.to_string()), &back).await,
    };

    let reviews = ReviewRepository::new(state.pool());
    match reviews.exists_for(user.id, product_id).await {
        Ok(Some(existing)) => {
            return Redirect::to(&format!("/reviews/{existing}/edit")).into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to check for an existing review");
            return flash_redirect(&session, Flash::error("Could not save the review."), &back)
                .await;
        }
    }

    match reviews.create(user.id, product_id, &input).await {
        Ok(review) => {
            tracing::info!(review_id = %review.id, product_id = %product_id, "Review created");
            flash_redirect(&session, Flash::success("Review saved."), "/reviews").await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create review");
            flash_redirect(&session, Flash::error("Could not save the review."), &back).await
        }
    }
}

/// Load a review owned by `user`, or the flash-and-redirect response to return.
async fn owned_review(
    state: &AppState,
    session: &Session,
    id: ReviewId,
    user: &CurrentUser,
) -> Result<Review, Response> {
    match ReviewRepository::new(state.pool()).get_by_id(id).await {
        Ok(Some(review)) if review.user_id == user.id => Ok(review),
        Ok(_) => Err(flash_redirect(session, Flash::warning("Review not found."), "/reviews").await),
        Err(e) => {
            tracing::error!(error = %e, review_id = %id, "Failed to load review");
            Err(flash_redirect(session, Flash::error("Could not load the review."), "/reviews").await)
        }
    }
}

/// Display the edit form for an own review.
#[instrument(skip(state, session))]
pub async fn edit_page(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ReviewId::new(id);
    let review = match owned_review(&state, &session, id, &user).await {
        Ok(review) => review,
        Err(response) => return response,
    };

    let product = match load_product(&state, review.product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Product not found."), "/reviews")
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load product");
            return flash_redirect(&session, Flash::error("Could not load the review."), "/reviews")
                .await;
        }
    };

    let action = format!("/reviews/{id}/edit");
    ReviewFormTemplate::new(Page::load(&session).await, &product, action, Some(&review))
        .into_response()
}

/// Save changes to an own review.
#[instrument(skip(state, session, form))]
pub async fn update(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let id = ReviewId::new(id);
    let back = format!("/reviews/{id}/edit");

    let input = match ReviewInput::parse(&form.comment, &form.rating) {
        Ok(input) => input,
        Err(e) => return flash_redirect(&session, Flash::warning(e.to_string()), &back).await,
    };

    match ReviewRepository::new(state.pool())
        .update(id, user.id, &input)
        .await
    {
        Ok(_) => flash_redirect(&session, Flash::success("Review updated."), "/reviews").await,
        Err(RepositoryError::NotFound) => {
            flash_redirect(&session, Flash::warning("Review not found."), "/reviews").await
        }
        Err(e) => {
            tracing::error!(error = %e, review_id = %id, "Failed to update review");
            flash_redirect(&session, Flash::error("Could not update the review."), &back).await
        }
    }
}

/// Delete an own review.
#[instrument(skip(state, session))]
pub async fn delete(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ReviewId::new(id);
    match ReviewRepository::new(state.pool())
        .delete_owned(id, user.id)
        .await
    {
        Ok(()) => flash_redirect(&session, Flash::success("Review deleted."), "/reviews").await,
        Err(RepositoryError::NotFound) => {
            flash_redirect(&session, Flash::warning("Review not found."), "/reviews").await
        }
        Err(e) => {
            tracing::error!(error = %e, review_id = %id, "Failed to delete review");
            flash_redirect(&session, Flash::error("Could not delete the review."), "/reviews")
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_options_best_first() {
        let options = rating_options(3);
        let values: Vec<_> = options.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![5, 4, 3, 2, 1]);

        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.value).collect();
        assert_eq!(selected, vec![3]);
    }
}
