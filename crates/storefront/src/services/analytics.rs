//! Signed embedding for the analytics dashboard.
//!
//! The back-office embeds a Metabase dashboard in an iframe. Metabase
//! accepts a JWT signed with the instance's embedding secret (HS256) whose
//! claims name the dashboard and an expiry.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::AnalyticsConfig;

type HmacSha256 = Hmac<Sha256>;

/// Fragment appended to embed URLs.
const EMBED_OPTIONS: &str = "#bordered=true&titled=true";

/// Errors building an embed URL.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Site URL, secret key or dashboard ID is missing.
    #[error("analytics embedding is not configured")]
    NotConfigured,

    /// The embedding secret cannot key an HMAC.
    #[error("invalid embedding secret")]
    InvalidSecret,

    /// Claims could not be serialized.
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct Resource {
    dashboard: i64,
}

#[derive(Serialize)]
struct Claims {
    resource: Resource,
    params: serde_json::Map<String, serde_json::Value>,
    exp: i64,
}

/// Build the iframe URL for the configured dashboard.
///
/// # Errors
///
/// Returns `AnalyticsError::NotConfigured` when any setting is missing.
pub fn dashboard_embed_url(
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Result<String, AnalyticsError> {
    let (Some(site_url), Some(secret), Some(dashboard)) = (
        config.site_url.as_deref(),
        config.secret_key.as_ref(),
        config.dashboard_id,
    ) else {
        return Err(AnalyticsError::NotConfigured);
    };

    let ttl = i64::try_from(config.token_ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        resource: Resource { dashboard },
        params: serde_json::Map::new(),
        exp: now.timestamp().saturating_add(ttl),
    };
    let token = sign_hs256(&claims, secret.expose_secret().as_bytes())?;

    Ok(format!(
        "{}/embed/dashboard/{token}{EMBED_OPTIONS}",
        site_url.trim_end_matches('/')
    ))
}

fn sign_hs256(claims: &Claims, secret: &[u8]) -> Result<String, AnalyticsError> {
    let header = Header {
        alg: "HS256",
        typ: "JWT",
    };
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
    );

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AnalyticsError::InvalidSecret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use secrecy::SecretString;

    use super::*;

    const SECRET: &str = "embedding-secret-for-tests-0123456789abcdef";

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            site_url: Some("https://metabase.ebano.co/".to_string()),
            secret_key: Some(SecretString::from(SECRET)),
            dashboard_id: Some(3),
            token_ttl: Duration::from_secs(600),
        }
    }

    fn decode_json(part: &str) -> serde_json::Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(part).unwrap()).unwrap()
    }

    #[test]
    fn test_embed_url_shape_and_claims() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let url = dashboard_embed_url(&config(), now).unwrap();

        let rest = url
            .strip_prefix("https://metabase.ebano.co/embed/dashboard/")
            .unwrap();
        let token = rest.strip_suffix("#bordered=true&titled=true").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        assert_eq!(
            decode_json(parts[0]),
            serde_json::json!({"alg": "HS256", "typ": "JWT"})
        );
        assert_eq!(
            decode_json(parts[1]),
            serde_json::json!({
                "resource": {"dashboard": 3},
                "params": {},
                "exp": now.timestamp() + 600
            })
        );
    }

    #[test]
    fn test_signature_verifies_with_secret() {
        let url = dashboard_embed_url(&config(), Utc::now()).unwrap();
        let token = url
            .rsplit('/')
            .next()
            .unwrap()
            .split('#')
            .next()
            .unwrap();
        let (signing_input, signature) = token.rsplit_once('.').unwrap();

        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        assert!(
            mac.verify_slice(&URL_SAFE_NO_PAD.decode(signature).unwrap())
                .is_ok()
        );
    }

    #[test]
    fn test_missing_settings_are_reported() {
        let mut cfg = config();
        cfg.dashboard_id = None;
        assert!(matches!(
            dashboard_embed_url(&cfg, Utc::now()),
            Err(AnalyticsError::NotConfigured)
        ));

        assert!(matches!(
            dashboard_embed_url(&AnalyticsConfig::default(), Utc::now()),
            Err(AnalyticsError::NotConfigured)
        ));
    }
}
