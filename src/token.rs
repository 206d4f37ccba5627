//! Session token codec.
//!
//! DESIGN
//! ======
//! Tokens are three `.`-separated segments; only the middle (claims) segment
//! is read. Signatures are never verified here: the primary backend remains
//! the authority and rejects forged or expired tokens on every call.
//!
//! ERROR HANDLING
//! ==============
//! Every failure collapses to `None` / "expired". Callers treat a malformed
//! token exactly like a missing one.

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "string_or_number")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Non-string values are dropped rather than rejecting the token.
    #[serde(default, deserialize_with = "string_only")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub email: Option<String>,
    /// Expiration instant in seconds since the UNIX epoch.
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Subject identifier: `sub`, falling back to `id`.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.id.as_deref())
    }
}

/// Current wall-clock time in whole seconds since the UNIX epoch.
#[must_use]
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Decode the claims segment of `token`.
///
/// Returns `None` unless the token has exactly three segments and the middle
/// one is base64 of a JSON object.
#[must_use]
pub fn decode(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        debug!("token rejected: expected three segments");
        return None;
    };

    let bytes = match decode_segment(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "token rejected: claims segment is not base64");
            return None;
        }
    };

    let value = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(_) => {
            debug!("token rejected: claims segment is not a JSON object");
            return None;
        }
        Err(e) => {
            debug!(error = %e, "token rejected: claims segment is not JSON");
            return None;
        }
    };

    serde_json::from_value(value)
        .inspect_err(|e| debug!(error = %e, "token rejected: malformed claims"))
        .ok()
}

/// Whether `token` should be treated as expired right now.
///
/// Absent, empty, undecodable, and `exp`-less tokens are all expired.
#[must_use]
pub fn is_expired(token: Option<&str>) -> bool {
    match token {
        Some(token) => is_expired_at(token, now_secs()),
        None => true,
    }
}

/// Whether `token` is expired at `now` (seconds since the UNIX epoch).
///
/// Expiry is inclusive: a token whose `exp` equals `now` is expired.
#[must_use]
pub fn is_expired_at(token: &str, now: i64) -> bool {
    if token.is_empty() {
        return true;
    }
    match decode(token).and_then(|claims| claims.exp) {
        Some(exp) if exp != 0 => exp <= now,
        _ => true,
    }
}

// Tokens are normally URL-safe without padding, but accept the standard
// alphabet and trailing padding too.
fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD.decode(normalized)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn string_only<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        _ => None,
    })
}
