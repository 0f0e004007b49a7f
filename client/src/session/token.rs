//! Local inspection of bearer tokens.
//!
//! Reads the `exp` claim out of a JWT payload without verifying the
//! signature. The result gates the UI only; the services make the real
//! authorization decision on every request.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Expiry (seconds since the epoch) from the token's payload, if it can
/// be read.
pub fn expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
}

/// `true` once `now` is past `exp`, compared at millisecond precision. A
/// token without a readable `exp` is always expired.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match expiry(token) {
        Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
        None => true,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token_with(claims: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn reads_exp_claim() {
        let t = token_with(r#"{"sub":"1","exp":1700000000}"#);
        assert_eq!(expiry(&t), Some(1_700_000_000));
    }

    #[test]
    fn expiry_boundary() {
        let t = token_with(r#"{"exp":1700000000}"#);
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        assert!(!is_expired_at(&t, at(1_699_999_999)));
        assert!(!is_expired_at(&t, at(1_700_000_000)));
        assert!(is_expired_at(&t, at(1_700_000_001)));

        // Inside the final second the token is already past `exp`.
        let ms = |m| Utc.timestamp_millis_opt(m).unwrap();
        assert!(!is_expired_at(&t, ms(1_700_000_000_000)));
        assert!(is_expired_at(&t, ms(1_700_000_000_001)));
        assert!(is_expired_at(&t, ms(1_700_000_000_500)));
    }

    #[test]
    fn unreadable_tokens_are_expired() {
        assert!(is_expired("not-a-jwt"));
        assert!(is_expired("a.!!!.c"));
        assert!(is_expired(&token_with(r#"{"sub":"1"}"#)));
        assert!(is_expired(&token_with("not json")));
    }

    #[test]
    fn tolerates_padding_and_fractional_exp() {
        let payload = base64::engine::general_purpose::STANDARD.encode(r#"{"exp":1700000000.5}"#);
        let t = format!("h.{payload}.s");
        assert_eq!(expiry(&t), Some(1_700_000_000));
    }
}
