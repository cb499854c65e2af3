//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::middleware::security_headers::content_security_policy;
use crate::services::ExchangeRateService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    rates: ExchangeRateService,
    csp: String,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let rates = ExchangeRateService::new(config.currency.clone());
        let csp = content_security_policy(config.analytics.frame_origin().as_deref());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                rates,
                csp,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the exchange-rate service.
    #[must_use]
    pub fn rates(&self) -> &ExchangeRateService {
        &self.inner.rates
    }

    /// The Content-Security-Policy header value.
    #[must_use]
    pub fn content_security_policy(&self) -> &str {
        &self.inner.csp
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool().clone()
    }
}
