//! Bearer token inspection
//!
//! Reads the unverified JWT payload to find out when a token expires.
//! Nothing here talks to the server and nothing verifies signatures; the
//! issuing server is the trust boundary. A token we cannot read is treated
//! as expired so that callers refresh instead of sending garbage.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;

/// Default "expiring soon" window used by `status`.
pub const DEFAULT_EXPIRY_THRESHOLD_MINUTES: i64 = 5;

/// base64url that accepts the payload with or without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Outcome of reading a token's expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// `exp` claim converted to milliseconds since the epoch.
    Decoded(i64),
    /// Malformed token, undecodable payload, or no `exp` claim.
    Undecodable,
}

impl Expiry {
    pub fn millis(self) -> Option<i64> {
        match self {
            Expiry::Decoded(ms) => Some(ms),
            Expiry::Undecodable => None,
        }
    }
}

/// Decode the middle segment of `token` and extract `exp`.
pub fn decode_expiry(token: &str) -> Expiry {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) if !payload.is_empty() => payload,
        _ => return Expiry::Undecodable,
    };

    let bytes = match PAYLOAD_ENGINE.decode(payload) {
        Ok(bytes) => bytes,
        Err(_) => return Expiry::Undecodable,
    };

    match serde_json::from_slice::<Claims>(&bytes) {
        Ok(Claims { exp: Some(exp) }) if exp.is_finite() => Expiry::Decoded((exp * 1000.0) as i64),
        _ => Expiry::Undecodable,
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `exp` of the token in milliseconds, if it can be read.
pub fn expires_at_millis(token: &str) -> Option<i64> {
    decode_expiry(token).millis()
}

/// True when the token is past its `exp`, or when `exp` cannot be read.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_millis())
}

pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode_expiry(token) {
        Expiry::Decoded(exp_ms) => exp_ms < now_ms,
        Expiry::Undecodable => true,
    }
}

/// True when the token expires within `threshold_minutes`, or when its
/// expiry cannot be read.
pub fn is_expiring_soon(token: &str, threshold_minutes: i64) -> bool {
    is_expiring_soon_at(token, threshold_minutes, now_millis())
}

pub fn is_expiring_soon_at(token: &str, threshold_minutes: i64, now_ms: i64) -> bool {
    match decode_expiry(token) {
        Expiry::Decoded(exp_ms) => {
            exp_ms.saturating_sub(now_ms) <= threshold_minutes.saturating_mul(60_000)
        }
        Expiry::Undecodable => true,
    }
}

/// Build an unsigned token whose payload carries the given claims.
/// Only used to fabricate tokens in tests.
#[cfg(test)]
pub fn unsigned_token(claims: &serde_json::Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

/// Unsigned token expiring `offset_secs` from now (negative for the past).
#[cfg(test)]
pub fn token_expiring_in(offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    unsigned_token(&serde_json::json!({ "sub": "ada@example.com", "exp": exp }))
}
