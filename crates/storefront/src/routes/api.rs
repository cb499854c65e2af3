//! JSON API route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::state::AppState;

/// Cached exchange-rate payload.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub inverse: Decimal,
    pub base: String,
    pub target: String,
    pub cached_at: DateTime<Utc>,
}

/// Report the exchange rate currently in use.
///
/// Never substitutes the configured fallback: a failed lookup is a 502.
#[instrument(skip(state))]
pub async fn rate(State(state): State<AppState>) -> Response {
    let rates = state.rates();
    match rates.current_rate().await {
        Ok(rate) => Json(RateResponse {
            rate: rate.rate,
            inverse: rate.inverse,
            base: rates.store_currency().to_string(),
            target: rates.display_currency().to_string(),
            cached_at: rate.fetched_at,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Exchange rate unavailable");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "exchange rate unavailable",
                    "detail": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_rate_response_shape() {
        let body = RateResponse {
            rate: Decimal::from_str("0.00025").unwrap(),
            inverse: Decimal::from_str("4000.0000").unwrap(),
            base: "COP".to_string(),
            target: "USD".to_string(),
            cached_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["rate"], json!(0.00025));
        assert_eq!(value["inverse"], json!(4000.0));
        assert_eq!(value["base"], "COP");
        assert_eq!(value["target"], "USD");
        assert_eq!(value["cached_at"], "2026-01-02T03:04:05Z");
    }
}
