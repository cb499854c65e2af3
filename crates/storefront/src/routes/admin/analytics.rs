//! Embedded analytics dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::Page;
use crate::services::{AnalyticsError, dashboard_embed_url};
use crate::state::AppState;

/// Analytics page template. `embed_url` is `None` when embedding is not set up.
#[derive(Template, WebTemplate)]
#[template(path = "admin/analytics.html")]
pub struct AnalyticsTemplate {
    pub page: Page,
    pub embed_url: Option<String>,
}

/// Display the dashboard iframe with a freshly signed token.
#[instrument(skip(state, session))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let embed_url = match dashboard_embed_url(&state.config().analytics, chrono::Utc::now()) {
        Ok(url) => Some(url),
        Err(AnalyticsError::NotConfigured) => None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to sign analytics embed token");
            None
        }
    };

    AnalyticsTemplate {
        page: Page::load(&session).await,
        embed_url,
    }
}
