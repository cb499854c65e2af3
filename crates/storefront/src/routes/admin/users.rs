//! User management route handlers.

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

use ebano_core::{Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Flash, User};
use crate::routes::{Page, flash_redirect};
use crate::state::AppState;

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Activation form. A checkbox: present means active.
#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    #[serde(default)]
    pub active: Option<String>,
}

impl ActiveForm {
    fn is_active(&self) -> bool {
        matches!(self.active.as_deref(), Some("on" | "true" | "1"))
    }
}

/// User list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
    pub page: Page,
    pub users: Vec<User>,
    pub self_id: UserId,
}

/// List every account.
#[instrument(skip(state, session))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    match UserRepository::new(state.pool()).list_all().await {
        Ok(users) => UsersTemplate {
            page: Page::load(&session).await,
            users,
            self_id: admin.id,
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load users");
            flash_redirect(&session, Flash::error("Could not load the users."), "/admin").await
        }
    }
}

/// Change a user's role.
#[instrument(skip(state, session))]
pub async fn set_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Response {
    let id = UserId::new(id);
    if id == admin.id {
        return flash_redirect(
            &session,
            Flash::warning("You cannot change your own role."),
            "/admin/users",
        )
        .await;
    }

    let Ok(role) = form.role.parse::<Role>() else {
        return flash_redirect(&session, Flash::warning("Unknown role."), "/admin/users").await;
    };

    let flash = match UserRepository::new(state.pool()).set_role(id, role).await {
        Ok(()) => {
            tracing::info!(user_id = %id, role = %role, admin_id = %admin.id, "Role changed");
            add_breadcrumb(
                "admin",
                "Role changed",
                &[("user_id", id.to_string()), ("role", role.to_string())],
            );
            Flash::success(format!("Role set to {role}."))
        }
        Err(RepositoryError::NotFound) => Flash::warning("User not found."),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to change role");
            Flash::error("Could not change the role.")
        }
    };
    flash_redirect(&session, flash, "/admin/users").await
}

/// Enable or disable an account.
#[instrument(skip(state, session))]
pub async fn set_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ActiveForm>,
) -> Response {
    let id = UserId::new(id);
    if id == admin.id {
        return flash_redirect(
            &session,
            Flash::warning("You cannot deactivate your own account."),
            "/admin/users",
        )
        .await;
    }

    let active = form.is_active();
    let flash = match UserRepository::new(state.pool()).set_active(id, active).await {
        Ok(()) => {
            tracing::info!(user_id = %id, active, admin_id = %admin.id, "Account status changed");
            Flash::success(if active {
                "Account enabled."
            } else {
                "Account disabled."
            })
        }
        Err(RepositoryError::NotFound) => Flash::warning("User not found."),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to change account status");
            Flash::error("Could not update the account.")
        }
    };
    flash_redirect(&session, flash, "/admin/users").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_checkbox() {
        assert!(ActiveForm { active: Some("on".into()) }.is_active());
        assert!(ActiveForm { active: Some("true".into()) }.is_active());
        assert!(!ActiveForm { active: None }.is_active());
        assert!(!ActiveForm { active: Some("off".into()) }.is_active());
    }
}
