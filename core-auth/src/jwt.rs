//! JWT expiry inspection.
//!
//! Decodes the payload segment of a JWT without verifying its signature;
//! the server remains the authority on validity. The check here only decides
//! whether a token is worth sending at all.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

/// Tokens within this many milliseconds of expiry are treated as expired, so
/// a request does not leave the device with a token that dies in flight.
pub const EXPIRY_BUFFER_MS: i64 = 30_000;

#[derive(Debug, Deserialize)]
struct Claims {
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the claims payload of a JWT. Returns `None` if the token does not
/// have three segments or the payload is not valid base64url JSON.
fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    segments.next()?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether `token` is absent, malformed-but-expiring, or within the expiry
/// buffer of its `exp` claim.
///
/// Decoding never fails outward. A missing token is expired (there is nothing
/// to send); an unparseable token or one without an `exp` claim is NOT
/// treated as expired, and the server gets the final say when it is used.
pub fn is_token_expired(token: Option<&str>, label: &str) -> bool {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return true,
    };

    let claims = match decode_claims(token) {
        Some(c) => c,
        None => {
            tracing::warn!(label, "Could not decode token payload, assuming usable");
            return false;
        }
    };

    // Saturate: an absurdly large exp is just a far-future expiry.
    let exp_ms = match claims.exp {
        Some(exp) => exp.saturating_mul(1000),
        None => return false,
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let expired = now_ms >= exp_ms.saturating_sub(EXPIRY_BUFFER_MS);
    if expired {
        tracing::debug!(label, "Token is expired or inside the expiry buffer");
    }
    expired
}
