//! Unverified JWT payload inspection
//!
//! Bearer tokens are opaque to the harness, but most issuers hand out JWTs.
//! Reading the payload lets status output show when a token really expires.

use base64::{Engine as _, engine::general_purpose};
use serde_json::Value;

/// Claims relevant to token lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Expiry in epoch milliseconds
    pub expires_at_ms: Option<i64>,
    /// Issue time in epoch milliseconds
    pub issued_at_ms: Option<i64>,
    pub client_id: Option<String>,
    pub token_type: Option<String>,
}

/// Decode the payload segment of a JWT. Returns `None` for opaque tokens.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .ok()?;
    let payload: Value = serde_json::from_slice(&bytes).ok()?;

    // Standard `exp` is seconds; IMS-style tokens carry `created_at` and
    // `expires_in` in milliseconds instead.
    // Values that overflow epoch milliseconds are dropped.
    let issued_at_ms = number(&payload, "created_at")
        .or_else(|| number(&payload, "iat")?.checked_mul(1000));
    let expires_at_ms = match number(&payload, "exp") {
        Some(exp) => exp.checked_mul(1000),
        None => {
            let created = number(&payload, "created_at");
            let lifetime = number(&payload, "expires_in");
            created.zip(lifetime).and_then(|(c, l)| c.checked_add(l))
        }
    };

    Some(TokenClaims {
        expires_at_ms,
        issued_at_ms,
        client_id: string(&payload, "client_id"),
        token_type: string(&payload, "type"),
    })
}

fn number(payload: &Value, key: &str) -> Option<i64> {
    match payload.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string(payload: &Value, key: &str) -> Option<String> {
    payload.get(key)?.as_str().map(str::to_string)
}

/// Short, non-secret preview of a token for logs and status output
pub fn redact(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    if token.chars().count() <= 12 {
        "****".to_string()
    } else {
        format!("{}…({} chars)", visible, token.chars().count())
    }
}
