//! Customer area route handlers.
//!
//! Every handler here takes `RequireCustomer`: guests are sent to the login
//! page and admins back to the home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use ebano_core::OrderId;

use super::{Page, flash_redirect, prices_for};
use crate::db::{OrderRepository, ReviewRepository, UserRepository};
use crate::filters;
use crate::middleware::{RequireCustomer, set_current_user};
use crate::models::{CurrentUser, Flash, Order, OrderDetail, ProfileUpdate, User};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: usize = 5;

// =============================================================================
// View Types
// =============================================================================

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub placed_at: String,
    pub status: String,
    pub total: Option<String>,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub product_name: String,
    pub quantity: i32,
    pub subtotal: Option<String>,
}

async fn order_views(state: &AppState, viewer: &CurrentUser, orders: &[Order]) -> Vec<OrderView> {
    let totals: Vec<_> = orders.iter().map(|o| o.total).collect();
    let prices = prices_for(state, Some(viewer), &totals).await;

    orders
        .iter()
        .enumerate()
        .map(|(i, o)| OrderView {
            id: o.id,
            placed_at: o.placed_at.format("%Y-%m-%d %H:%M").to_string(),
            status: o.status.to_string(),
            total: prices.as_ref().and_then(|p| p.get(i).cloned()),
        })
        .collect()
}

// =============================================================================
// Form Types
// =============================================================================

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub country: String,
}

impl ProfileForm {
    /// Validate into a profile update. Blank optional fields become `None`.
    fn validate(&self) -> Result<ProfileUpdate, &'static str> {
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err("Name is required.");
        }
        let optional = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Ok(ProfileUpdate {
            full_name: full_name.to_string(),
            phone: optional(&self.phone),
            address: optional(&self.address),
            country: optional(&self.country),
        })
    }
}

/// Password change form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Customer dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "account/dashboard.html")]
pub struct DashboardTemplate {
    pub page: Page,
    pub recent_orders: Vec<OrderView>,
    pub order_count: usize,
    pub review_count: usize,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<OrderView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order_detail.html")]
pub struct OrderDetailTemplate {
    pub page: Page,
    pub order: OrderView,
    pub lines: Vec<OrderLineView>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: Page,
    pub profile: User,
}

/// Password change template.
#[derive(Template, WebTemplate)]
#[template(path = "account/password.html")]
pub struct PasswordTemplate {
    pub page: Page,
}

// =============================================================================
// Handlers
// =============================================================================

/// Customer overview: recent orders and activity counts.
#[instrument(skip(state, session))]
pub async fn dashboard(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let orders = match OrderRepository::new(state.pool()).list_for_user(user.id).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load orders");
            return flash_redirect(&session, Flash::error("Could not load your orders."), "/")
                .await;
        }
    };
    let review_count = ReviewRepository::new(state.pool())
        .list_for_user(user.id)
        .await
        .map(|r| r.len())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load reviews");
            0
        });

    let recent: Vec<_> = orders.iter().take(RECENT_ORDERS).cloned().collect();
    let recent_orders = order_views(&state, &user, &recent).await;

    DashboardTemplate {
        page: Page::load(&session).await,
        recent_orders,
        order_count: orders.len(),
        review_count,
    }
    .into_response()
}

/// Order history, newest first.
#[instrument(skip(state, session))]
pub async fn orders(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let orders = match OrderRepository::new(state.pool()).list_for_user(user.id).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load orders");
            return flash_redirect(
                &session,
                Flash::error("Could not load your orders."),
                "/dashboard",
            )
            .await;
        }
    };

    OrdersTemplate {
        page: Page::load(&session).await,
        orders: order_views(&state, &user, &orders).await,
    }
    .into_response()
}

/// One of the customer's own orders.
#[instrument(skip(state, session))]
pub async fn order_detail(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = OrderId::new(id);
    let OrderDetail { order, lines } = match OrderRepository::new(state.pool())
        .get_for_user(id, user.id)
        .await
    {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            return flash_redirect(&session, Flash::warning("Order not found."), "/orders").await;
        }
        Err(e) => {
            tracing::error!(error = %e, order_id = %id, "Failed to load order");
            return flash_redirect(&session, Flash::error("Could not load the order."), "/orders")
                .await;
        }
    };

    let subtotals: Vec<_> = lines.iter().map(|l| l.subtotal).collect();
    let prices = prices_for(&state, Some(&user), &subtotals).await;
    let lines = lines
        .iter()
        .enumerate()
        .map(|(i, l)| OrderLineView {
            product_name: l.product_name.clone(),
            quantity: l.quantity,
            subtotal: prices.as_ref().and_then(|p| p.get(i).cloned()),
        })
        .collect();
    let order = order_views(&state, &user, std::slice::from_ref(&order))
        .await
        .into_iter()
        .next();

    let Some(order) = order else {
        return flash_redirect(&session, Flash::warning("Order not found."), "/orders").await;
    };

    OrderDetailTemplate {
        page: Page::load(&session).await,
        order,
        lines,
    }
    .into_response()
}

/// Display the profile form.
#[instrument(skip(state, session))]
pub async fn profile_page(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match UserRepository::new(state.pool()).get_by_id(user.id).await {
        Ok(Some(profile)) => ProfileTemplate {
            page: Page::load(&session).await,
            profile,
        }
        .into_response(),
        Ok(None) => flash_redirect(&session, Flash::error("Account not found."), "/").await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile");
            flash_redirect(
                &session,
                Flash::error("Could not load your profile."),
                "/dashboard",
            )
            .await
        }
    }
}

/// Save the profile form.
#[instrument(skip(state, session, form))]
pub async fn update_profile(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Response {
    let update = match form.validate() {
        Ok(update) => update,
        Err(message) => return flash_redirect(&session, Flash::warning(message), "/profile").await,
    };

    match UserRepository::new(state.pool())
        .update_profile(user.id, &update)
        .await
    {
        Ok(updated) => {
            if let Err(e) = set_current_user(&session, &CurrentUser::from(&updated)).await {
                tracing::warn!(error = %e, "Failed to refresh session user");
            }
            flash_redirect(&session, Flash::success("Profile updated."), "/profile").await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update profile");
            flash_redirect(
                &session,
                Flash::error("Could not update your profile."),
                "/profile",
            )
            .await
        }
    }
}

/// Display the password change form.
#[instrument(skip(session))]
pub async fn password_page(RequireCustomer(_user): RequireCustomer, session: Session) -> Response {
    PasswordTemplate {
        page: Page::load(&session).await,
    }
    .into_response()
}

/// Change the password after checking the current one.
#[instrument(skip(state, session, form))]
pub async fn change_password(
    RequireCustomer(user): RequireCustomer,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PasswordForm>,
) -> Response {
    let result = AuthService::new(state.pool())
        .change_password(
            user.id,
            &form.current_password,
            &form.new_password,
            &form.new_password_confirm,
        )
        .await;

    match result {
        Ok(()) => {
            tracing::info!("Password changed");
            flash_redirect(&session, Flash::success("Password changed."), "/profile").await
        }
        Err(AuthError::InvalidCredentials) => {
            flash_redirect(
                &session,
                Flash::error("Current password is incorrect."),
                "/profile/password",
            )
            .await
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => {
            tracing::error!(error = %e, "Failed to change password");
            flash_redirect(&session, Flash::error(e.user_message()), "/profile/password").await
        }
        Err(e) => flash_redirect(&session, Flash::warning(e.user_message()), "/profile/password").await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, phone: &str) -> ProfileForm {
        ProfileForm {
            full_name: name.to_string(),
            phone: phone.to_string(),
            address: String::new(),
            country: "  Colombia ".to_string(),
        }
    }

    #[test]
    fn test_profile_requires_name() {
        assert!(form("   ", "").validate().is_err());
    }

    #[test]
    fn test_profile_blank_optionals_become_none() {
        let update = form("Ana Ruiz", " ").validate().unwrap();
        assert_eq!(update.full_name, "Ana Ruiz");
        assert_eq!(update.phone, None);
        assert_eq!(update.address, None);
        assert_eq!(update.country.as_deref(), Some("Colombia"));
    }
}
