//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user, optionally with a
//! specific role, in route handlers. Page requests are redirected with a
//! flash message; API requests get a bare status code.
//!
//! The session only remembers who logged in. Every extraction reloads the
//! account, so role changes and deactivation apply to open sessions on
//! their next request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::PgPool;
use tower_sessions::Session;

use ebano_core::Role;

use crate::db::UserRepository;
use crate::models::{CurrentUser, Flash, User, flash, session_keys};

/// Extractor that requires a logged-in user of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in customer.
pub struct RequireCustomer(pub CurrentUser);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection returned by the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in: redirect to the login page.
    RedirectToLogin,
    /// Logged in with the wrong role: redirect home.
    RedirectHome,
    /// Not logged in on an API route.
    Unauthorized,
    /// Wrong role on an API route.
    Forbidden,
    /// The account could not be loaded.
    Unavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

fn is_api(parts: &Parts) -> bool {
    parts.uri.path().starts_with("/api/")
}

/// Read the logged-in user from the session.
///
/// This is the snapshot taken at login; the extractors refresh it.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Outcome of comparing the session snapshot with the stored account.
#[derive(Debug, PartialEq, Eq)]
enum Refresh {
    Unchanged,
    Changed(CurrentUser),
    /// Deleted or deactivated.
    Revoked,
}

fn reconcile(snapshot: &CurrentUser, stored: Option<&User>) -> Refresh {
    match stored {
        Some(user) if user.active => {
            let fresh = CurrentUser::from(user);
            if fresh == *snapshot {
                Refresh::Unchanged
            } else {
                Refresh::Changed(fresh)
            }
        }
        _ => Refresh::Revoked,
    }
}

/// Reject a request that needs a login.
async fn login_required(parts: &Parts, session: &Session, message: &str) -> AuthRejection {
    if is_api(parts) {
        return AuthRejection::Unauthorized;
    }
    flash::push(session, Flash::warning(message)).await;
    AuthRejection::RedirectToLogin
}

/// Drop the identity and cart of a revoked account.
async fn end_revoked_session(session: &Session) {
    if let Err(e) = clear_session(session).await {
        tracing::error!(error = %e, "Failed to clear revoked session");
    }
}

/// Load the session user's account as it is now.
///
/// `Ok(None)` means nobody is logged in, or the account was revoked and the
/// session has been ended.
async fn load_current(
    session: &Session,
    pool: &PgPool,
) -> Result<Option<CurrentUser>, AuthRejection> {
    let Some(snapshot) = current_user(session).await else {
        return Ok(None);
    };

    let stored = UserRepository::new(pool)
        .get_by_id(snapshot.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %snapshot.id, "Failed to load session user");
            AuthRejection::Unavailable
        })?;

    match reconcile(&snapshot, stored.as_ref()) {
        Refresh::Unchanged => Ok(Some(snapshot)),
        Refresh::Changed(fresh) => {
            if let Err(e) = session.insert(session_keys::CURRENT_USER, &fresh).await {
                tracing::warn!(error = %e, "Failed to refresh session user");
            }
            Ok(Some(fresh))
        }
        Refresh::Revoked => {
            tracing::info!(user_id = %snapshot.id, "Session ended for revoked account");
            end_revoked_session(session).await;
            Ok(None)
        }
    }
}

/// Resolve the session user, or reject with the login redirect.
async fn authenticated(
    parts: &Parts,
    pool: &PgPool,
) -> Result<(Session, CurrentUser), AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)?;

    let had_login = current_user(&session).await.is_some();
    match load_current(&session, pool).await? {
        Some(user) => Ok((session, user)),
        None if had_login => Err(login_required(
            parts,
            &session,
            "Your session has ended. Please log in again.",
        )
        .await),
        None => Err(login_required(parts, &session, "Please log in to continue.").await),
    }
}

/// Check an authenticated user's role.
async fn enforce_role(
    parts: &Parts,
    session: &Session,
    user: CurrentUser,
    role: Role,
) -> Result<CurrentUser, AuthRejection> {
    if user.role == role {
        return Ok(user);
    }

    tracing::warn!(user_id = %user.id, required = role.as_str(), "Role check failed");
    if is_api(parts) {
        return Err(AuthRejection::Forbidden);
    }
    flash::push(session, Flash::error("Access restricted.")).await;
    Err(AuthRejection::RedirectHome)
}

/// Resolve the session user and check their role.
async fn with_role(
    parts: &Parts,
    pool: &PgPool,
    role: Role,
) -> Result<CurrentUser, AuthRejection> {
    let (session, user) = authenticated(parts, pool).await?;
    enforce_role(parts, &session, user, role).await
}

impl<S> FromRequestParts<S> for RequireAuth
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        authenticated(parts, &pool).await.map(|(_, user)| Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        with_role(parts, &pool, Role::Customer).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        with_role(parts, &pool, Role::Admin).await.map(Self)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
/// A revoked account, or a lookup failure, reads as nobody.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        let pool = PgPool::from_ref(state);
        Ok(Self(load_current(session, &pool).await.ok().flatten()))
    }
}

/// Store the logged-in user in the session.
///
/// The session ID is cycled first so a pre-login session ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// End the session: identity, cart and everything else.
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use chrono::Utc;
    use tower_sessions::MemoryStore;

    use ebano_core::{Email, UserId};

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            name: "Ana Gómez".to_string(),
            email: Email::parse("ana@ebano.co").unwrap(),
            role,
        }
    }

    fn stored(role: Role, active: bool) -> User {
        User {
            id: UserId::new(7),
            username: "ana".to_string(),
            full_name: "Ana Gómez".to_string(),
            email: Email::parse("ana@ebano.co").unwrap(),
            role,
            phone: None,
            address: None,
            country: None,
            active,
            created_at: Utc::now(),
        }
    }

    /// A pool that never connects; guest paths must not touch it.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://ebano@127.0.0.1:1/ebano").unwrap()
    }

    async fn parts_with(path: &str, logged_in: Option<CurrentUser>) -> (Parts, Session) {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        if let Some(user) = logged_in {
            session.insert(session_keys::CURRENT_USER, user).await.unwrap();
        }
        let (mut parts, ()) = Request::builder().uri(path).body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        (parts, session)
    }

    #[tokio::test]
    async fn test_require_auth_redirects_guest_with_flash() {
        let (mut parts, session) = parts_with("/cart", None).await;
        let rejection = RequireAuth::from_request_parts(&mut parts, &lazy_pool())
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::RedirectToLogin));
        assert_eq!(flash::take(&session).await.len(), 1);
    }

    #[tokio::test]
    async fn test_api_guest_gets_unauthorized() {
        let (mut parts, _) = parts_with("/api/orders", None).await;
        let rejection = RequireAuth::from_request_parts(&mut parts, &lazy_pool())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_auth_guest() {
        let (mut parts, _) = parts_with("/", None).await;
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &lazy_pool())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn test_reconcile_unchanged_account() {
        let snapshot = user(Role::Customer);
        assert_eq!(
            reconcile(&snapshot, Some(&stored(Role::Customer, true))),
            Refresh::Unchanged
        );
    }

    #[test]
    fn test_reconcile_demoted_admin_takes_stored_role() {
        let snapshot = user(Role::Admin);
        let Refresh::Changed(fresh) = reconcile(&snapshot, Some(&stored(Role::Customer, true)))
        else {
            panic!("expected the stored role to replace the snapshot");
        };
        assert_eq!(fresh.role, Role::Customer);
        assert_eq!(fresh.id, snapshot.id);
    }

    #[test]
    fn test_reconcile_deactivated_or_deleted_is_revoked() {
        let snapshot = user(Role::Customer);
        assert_eq!(
            reconcile(&snapshot, Some(&stored(Role::Customer, false))),
            Refresh::Revoked
        );
        assert_eq!(reconcile(&snapshot, None), Refresh::Revoked);
    }

    #[tokio::test]
    async fn test_demoted_admin_is_turned_away_from_admin() {
        let (parts, session) = parts_with("/admin", Some(user(Role::Admin))).await;
        let Refresh::Changed(fresh) =
            reconcile(&user(Role::Admin), Some(&stored(Role::Customer, true)))
        else {
            panic!("expected a refreshed identity");
        };
        let rejection = enforce_role(&parts, &session, fresh, Role::Admin)
            .await
            .err()
            .unwrap();
        assert!(matches!(rejection, AuthRejection::RedirectHome));
        assert_eq!(flash::take(&session).await[0].message, "Access restricted.");
    }

    #[tokio::test]
    async fn test_revoked_session_loses_identity_and_cart() {
        let (parts, session) = parts_with("/dashboard", Some(user(Role::Customer))).await;
        session.insert(session_keys::CART, vec![1, 2, 3]).await.unwrap();

        end_revoked_session(&session).await;
        let rejection = login_required(&parts, &session, "Your session has ended.").await;

        assert!(matches!(rejection, AuthRejection::RedirectToLogin));
        assert!(current_user(&session).await.is_none());
        assert!(session.get::<Vec<i32>>(session_keys::CART).await.unwrap().is_none());
        assert_eq!(flash::take(&session).await.len(), 1);
    }

    #[tokio::test]
    async fn test_enforce_role_accepts_matching_role() {
        let (parts, session) = parts_with("/dashboard", Some(user(Role::Customer))).await;
        let current = enforce_role(&parts, &session, user(Role::Customer), Role::Customer)
            .await
            .unwrap();
        assert_eq!(current.id, UserId::new(7));
    }

    #[tokio::test]
    async fn test_enforce_role_on_api_is_forbidden() {
        let (parts, session) = parts_with("/api/rate", Some(user(Role::Customer))).await;
        let rejection = enforce_role(&parts, &session, user(Role::Customer), Role::Admin)
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.into_response().status(), StatusCode::FORBIDDEN);
    }
}
