//! Error reporting with Sentry integration.
//!
//! Page handlers never show error pages: they log, report server-side
//! failures here, then flash a message and redirect (see `routes`).

/// Log a server-side failure and send it to Sentry.
///
/// Returns the Sentry event ID so callers can correlate logs.
pub fn report_error<E>(error: &E, context: &str) -> uuid::Uuid
where
    E: std::error::Error + ?Sized,
{
    let event_id = sentry::capture_error(error);
    tracing::error!(error = %error, sentry_event_id = %event_id, "{context}");
    event_id
}

/// Set the Sentry user context.
///
/// Call this after successful login to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_report_error_without_client() {
        // No Sentry client is bound in tests: the event is dropped.
        let id = report_error(&RepositoryError::NotFound, "Lookup failed");
        assert!(id.is_nil());
    }

    #[test]
    fn test_breadcrumb_without_client() {
        add_breadcrumb("cart", "Product added", &[("product_id", "3".to_string())]);
        set_sentry_user(&7, Some("ana@ebano.co"));
        clear_sentry_user();
    }
}
