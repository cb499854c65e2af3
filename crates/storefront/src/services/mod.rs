//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password registration, login and password changes
//! - `currency` - Cached store-to-display exchange rate
//! - `checkout` - Cart to order conversion
//! - `analytics` - Signed analytics dashboard embedding

pub mod analytics;
pub mod auth;
pub mod checkout;
pub mod currency;

pub use analytics::{AnalyticsError, dashboard_embed_url};
pub use auth::{AuthError, AuthService, Registration};
pub use checkout::{CheckoutError, CheckoutService};
pub use currency::{CurrencyError, ExchangeRate, ExchangeRateService};
