//! Authentication route handlers.
//!
//! Login, registration and logout against the local `users` table.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{Page, flash_redirect};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_session, set_current_user};
use crate::models::{CurrentUser, Flash, flash};
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl From<RegisterForm> for Registration {
    fn from(form: RegisterForm) -> Self {
        Self {
            full_name: form.full_name,
            email: form.email,
            password: form.password,
            password_confirm: form.password_confirm,
            phone: form.phone,
            address: form.address,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: Page,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page. Logged-in users go to their home page.
#[instrument(skip(user, session))]
pub async fn login_page(OptionalAuth(user): OptionalAuth, session: Session) -> Response {
    if let Some(user) = user {
        return Redirect::to(user.home_path()).into_response();
    }
    LoginTemplate {
        page: Page::load(&session).await,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => {
            tracing::error!(error = %e, "Login failed");
            return flash_redirect(&session, Flash::error(e.user_message()), "/login").await;
        }
        Err(e) => {
            tracing::info!(reason = %e, "Login rejected");
            return flash_redirect(&session, Flash::error(e.user_message()), "/login").await;
        }
    };

    let current = CurrentUser::from(&user);
    if let Err(e) = set_current_user(&session, &current).await {
        tracing::error!(error = %e, "Failed to store user in session");
        return flash_redirect(
            &session,
            Flash::error("Something went wrong. Please try again."),
            "/login",
        )
        .await;
    }

    set_sentry_user(&current.id, Some(current.email.as_str()));
    add_breadcrumb("auth", "User logged in", &[("role", current.role.to_string())]);
    tracing::info!(user_id = %current.id, role = %current.role, "User logged in");

    flash_redirect(&session, Flash::success("Login successful."), current.home_path()).await
}

/// Display the registration page.
#[instrument(skip(user, session))]
pub async fn register_page(OptionalAuth(user): OptionalAuth, session: Session) -> Response {
    if let Some(user) = user {
        return Redirect::to(user.home_path()).into_response();
    }
    RegisterTemplate {
        page: Page::load(&session).await,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration::from(form);
    match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Customer registered");
            add_breadcrumb("auth", "Customer registered", &[]);
            flash_redirect(
                &session,
                Flash::success("Account created, you can log in."),
                "/login",
            )
            .await
        }
        Err(AuthError::UserAlreadyExists) => {
            flash_redirect(
                &session,
                Flash::warning(AuthError::UserAlreadyExists.user_message()),
                "/register",
            )
            .await
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => {
            tracing::error!(error = %e, "Registration failed");
            flash_redirect(&session, Flash::error(e.user_message()), "/register").await
        }
        Err(e) => flash_redirect(&session, Flash::error(e.user_message()), "/register").await,
    }
}

/// Handle logout: drop the whole session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_session(&session).await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }
    clear_sentry_user();
    flash::push(&session, Flash::info("You have been logged out.")).await;
    Redirect::to("/").into_response()
}
