//! Exchange-rate service.
//!
//! Converts store-currency amounts (COP by default) to the display currency
//! (USD by default). The rate is fetched from an HTTP API and cached with
//! `moka` for the configured TTL; concurrent cache misses share one upstream
//! request.
//!
//! Two policies exist for upstream failures:
//! - [`ExchangeRateService::current_rate`] never substitutes a rate and
//!   returns the error.
//! - [`ExchangeRateService::convert`] uses `EXCHANGE_FALLBACK_RATE` when one
//!   is configured, and errors otherwise.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use ebano_core::{format_display_amount, round_display};

use crate::config::CurrencyConfig;

/// Fractional digits kept for the inverse rate.
const INVERSE_DECIMALS: u32 = 4;

/// Errors from fetching or interpreting an exchange rate.
#[derive(Debug, Clone, Error)]
pub enum CurrencyError {
    /// The HTTP request failed or returned a non-success status.
    #[error("exchange API request failed: {0}")]
    Request(String),

    /// The response body was not JSON.
    #[error("exchange API returned invalid JSON: {0}")]
    Parse(String),

    /// No rate for the display currency was found in the response.
    #[error("exchange API response has no {0} rate")]
    MissingRate(String),

    /// The rate was zero, negative, or not a number.
    #[error("exchange API returned an invalid rate: {0}")]
    InvalidRate(String),
}

impl From<reqwest::Error> for CurrencyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

/// A cached store-to-display exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    /// Display units per store unit.
    pub rate: Decimal,
    /// Store units per display unit, rounded to 4 decimals.
    pub inverse: Decimal,
    /// When the rate was fetched from the API.
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Build a rate, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::InvalidRate` if `rate` is not positive.
    pub fn new(rate: Decimal, fetched_at: DateTime<Utc>) -> Result<Self, CurrencyError> {
        if rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate(rate.to_string()));
        }
        let inverse = (Decimal::ONE / rate).round_dp(INVERSE_DECIMALS);
        Ok(Self {
            rate,
            inverse,
            fetched_at,
        })
    }
}

/// Exchange-rate client with a single-entry TTL cache.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct ExchangeRateService {
    inner: Arc<ExchangeRateServiceInner>,
}

struct ExchangeRateServiceInner {
    client: reqwest::Client,
    config: CurrencyConfig,
    cache: Cache<String, ExchangeRate>,
}

impl ExchangeRateService {
    /// Create a new exchange-rate service.
    #[must_use]
    pub fn new(config: CurrencyConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner: Arc::new(ExchangeRateServiceInner {
                client: reqwest::Client::new(),
                config,
                cache,
            }),
        }
    }

    /// Store currency code (e.g. `COP`).
    #[must_use]
    pub fn store_currency(&self) -> &str {
        &self.inner.config.store_currency
    }

    /// Display currency code (e.g. `USD`).
    #[must_use]
    pub fn display_currency(&self) -> &str {
        &self.inner.config.display_currency
    }

    /// The current rate, from cache or the API. Never falls back.
    ///
    /// # Errors
    ///
    /// Returns a `CurrencyError` if the rate is not cached and the API call
    /// fails or returns an unusable body.
    #[instrument(skip(self))]
    pub async fn current_rate(&self) -> Result<ExchangeRate, CurrencyError> {
        let key = format!(
            "{}:{}",
            self.inner.config.store_currency, self.inner.config.display_currency
        );

        self.inner
            .cache
            .try_get_with(key, self.fetch_rate())
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    /// Convert a store-currency amount to the display currency, rounded to
    /// 2 decimals.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when no fallback rate is configured.
    pub async fn convert(&self, amount: Decimal) -> Result<Decimal, CurrencyError> {
        let rate = self.effective_rate().await?;
        Ok(round_display(amount * rate))
    }

    /// Format a store-currency amount in the display currency, e.g.
    /// `$10.95 USD`. Renders `USD price unavailable` if conversion fails.
    pub async fn display_price(&self, amount: Decimal) -> String {
        let rate = self.effective_rate().await;
        self.format_with(rate.as_ref(), amount)
    }

    /// Format several amounts with a single rate lookup.
    pub async fn display_prices(&self, amounts: &[Decimal]) -> Vec<String> {
        let rate = self.effective_rate().await;
        amounts
            .iter()
            .map(|amount| self.format_with(rate.as_ref(), *amount))
            .collect()
    }

    /// Rate used for conversions: the live rate, or the fallback if one is
    /// configured and the live rate is unavailable.
    async fn effective_rate(&self) -> Result<Decimal, CurrencyError> {
        match self.current_rate().await {
            Ok(rate) => Ok(rate.rate),
            Err(e) => match self.inner.config.fallback_rate {
                Some(fallback) => {
                    warn!(error = %e, %fallback, "Using fallback exchange rate");
                    Ok(fallback)
                }
                None => {
                    warn!(error = %e, "Exchange rate unavailable");
                    Err(e)
                }
            },
        }
    }

    fn format_with(&self, rate: Result<&Decimal, &CurrencyError>, amount: Decimal) -> String {
        match rate {
            Ok(rate) => format_display_amount(round_display(amount * *rate), self.display_currency()),
            Err(_) => self.unavailable_label(),
        }
    }

    fn unavailable_label(&self) -> String {
        format!("{} price unavailable", self.display_currency())
    }

    async fn fetch_rate(&self) -> Result<ExchangeRate, CurrencyError> {
        let config = &self.inner.config;
        let mut params = vec![
            ("base", config.store_currency.clone()),
            ("symbols", config.display_currency.clone()),
        ];
        if let Some(key) = &config.api_key {
            params.push(("access_key", key.expose_secret().to_string()));
        }

        let response = self
            .inner
            .client
            .get(&config.api_url)
            .query(&params)
            .timeout(config.request_timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| CurrencyError::Parse(e.to_string()))?;

        let rate = parse_rate_response(&body, &config.store_currency, &config.display_currency)?;
        let rate = ExchangeRate::new(rate, Utc::now())?;
        debug!(rate = %rate.rate, inverse = %rate.inverse, "Exchange rate refreshed");
        Ok(rate)
    }
}

/// Extract the `base` → `target` rate from an exchange API response.
///
/// Accepted shapes, tried in order:
/// - `{"rates": {"USD": r}}`
/// - `{"conversion_rates": {"USD": r}}`
/// - `{"quotes": {"COPUSD": r}}`
/// - `{"USD": r}`
///
/// The rate may be a JSON number or a numeric string.
///
/// # Errors
///
/// Returns `CurrencyError::MissingRate` if no shape matches and
/// `CurrencyError::InvalidRate` if the value is not a positive number.
pub fn parse_rate_response(body: &Value, base: &str, target: &str) -> Result<Decimal, CurrencyError> {
    let quote_key = format!("{base}{target}");

    let raw = body
        .get("rates")
        .and_then(|rates| rates.get(target))
        .or_else(|| body.get("conversion_rates").and_then(|r| r.get(target)))
        .or_else(|| body.get("quotes").and_then(|q| q.get(&quote_key)))
        .or_else(|| body.get(target))
        .ok_or_else(|| CurrencyError::MissingRate(target.to_string()))?;

    let rate = rate_value(raw).ok_or_else(|| CurrencyError::InvalidRate(raw.to_string()))?;
    if rate <= Decimal::ZERO {
        return Err(CurrencyError::InvalidRate(rate.to_string()));
    }
    Ok(rate)
}

fn rate_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::json;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_rates_shape() {
        let body = json!({"base": "COP", "rates": {"USD": 0.00025}});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.00025"));
    }

    #[test]
    fn test_parse_conversion_rates_shape() {
        let body = json!({"conversion_rates": {"EUR": 0.00022, "USD": "0.00024"}});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.00024"));
    }

    #[test]
    fn test_parse_quotes_shape() {
        let body = json!({"source": "COP", "quotes": {"COPUSD": 0.000251}});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.000251"));
    }

    #[test]
    fn test_parse_root_shape() {
        let body = json!({"USD": "0.0003"});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.0003"));
    }

    #[test]
    fn test_parse_prefers_rates_over_root() {
        let body = json!({"rates": {"USD": 0.0002}, "USD": 0.0009});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.0002"));
    }

    #[test]
    fn test_parse_scientific_notation() {
        let body = json!({"rates": {"USD": "2.5e-4"}});
        assert_eq!(parse_rate_response(&body, "COP", "USD").unwrap(), dec("0.00025"));
    }

    #[test]
    fn test_parse_missing_rate() {
        let body = json!({"rates": {"EUR": 0.0002}});
        assert!(matches!(
            parse_rate_response(&body, "COP", "USD"),
            Err(CurrencyError::MissingRate(code)) if code == "USD"
        ));
    }

    #[test]
    fn test_parse_rejects_zero_and_garbage() {
        let zero = json!({"rates": {"USD": 0}});
        assert!(matches!(
            parse_rate_response(&zero, "COP", "USD"),
            Err(CurrencyError::InvalidRate(_))
        ));

        let text = json!({"rates": {"USD": "n/a"}});
        assert!(matches!(
            parse_rate_response(&text, "COP", "USD"),
            Err(CurrencyError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_inverse_rounded_to_four_places() {
        let rate = ExchangeRate::new(dec("0.00025"), Utc::now()).unwrap();
        assert_eq!(rate.inverse, dec("4000.0000"));

        let rate = ExchangeRate::new(dec("0.0003"), Utc::now()).unwrap();
        assert_eq!(rate.inverse, dec("3333.3333"));
    }

    // -------------------------------------------------------------------------
    // Stub exchange API
    // -------------------------------------------------------------------------

    async fn stub_api(body: serde_json::Value, status: StatusCode) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let app = Router::new().route(
            "/latest",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let counter = Arc::clone(&counter);
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("base").map(String::as_str), Some("COP"));
                    assert_eq!(params.get("symbols").map(String::as_str), Some("USD"));
                    (status, Json(body))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/latest"), hits)
    }

    fn config(api_url: String, fallback_rate: Option<Decimal>) -> CurrencyConfig {
        CurrencyConfig {
            api_url,
            request_timeout: Duration::from_secs(2),
            fallback_rate,
            ..CurrencyConfig::default()
        }
    }

    #[tokio::test]
    async fn test_rate_is_cached_within_ttl() {
        let (url, hits) = stub_api(json!({"rates": {"USD": 0.00025}}), StatusCode::OK).await;
        let service = ExchangeRateService::new(config(url, None));

        let first = service.current_rate().await.unwrap();
        let second = service.current_rate().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.rate, dec("0.00025"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_request() {
        let (url, hits) = stub_api(json!({"rates": {"USD": 0.00025}}), StatusCode::OK).await;
        let service = ExchangeRateService::new(config(url, None));

        let (a, b, c) = tokio::join!(
            service.current_rate(),
            service.current_rate(),
            service.current_rate()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_convert_rounds_to_cents() {
        let (url, _) = stub_api(json!({"rates": {"USD": 0.00025}}), StatusCode::OK).await;
        let service = ExchangeRateService::new(config(url, None));

        assert_eq!(service.convert(dec("42000")).await.unwrap(), dec("10.50"));
        assert_eq!(service.convert(dec("12345")).await.unwrap(), dec("3.09"));
        assert_eq!(service.display_price(dec("42000")).await, "$10.50 USD");
        assert_eq!(
            service.display_prices(&[dec("4000"), dec("4000000")]).await,
            vec!["$1.00 USD".to_string(), "$1,000.00 USD".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failure_without_fallback_errors() {
        let (url, _) = stub_api(json!({"error": "quota"}), StatusCode::SERVICE_UNAVAILABLE).await;
        let service = ExchangeRateService::new(config(url, None));

        assert!(matches!(
            service.current_rate().await,
            Err(CurrencyError::Request(_))
        ));
        assert!(service.convert(dec("1000")).await.is_err());
        assert_eq!(service.display_price(dec("1000")).await, "USD price unavailable");
    }

    #[tokio::test]
    async fn test_failure_with_fallback_converts() {
        let (url, _) = stub_api(json!({"rates": {}}), StatusCode::OK).await;
        let service = ExchangeRateService::new(config(url, Some(dec("0.0002"))));

        // the rate endpoint still reports the failure
        assert!(matches!(
            service.current_rate().await,
            Err(CurrencyError::MissingRate(_))
        ));
        assert_eq!(service.convert(dec("50000")).await.unwrap(), dec("10.00"));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (url, hits) = stub_api(json!({"rates": {}}), StatusCode::OK).await;
        let service = ExchangeRateService::new(config(url, None));

        assert!(service.current_rate().await.is_err());
        assert!(service.current_rate().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
