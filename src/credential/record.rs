//! Cached token record and its validity rules

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Seconds shaved off the issuer-reported lifetime before a token counts as expired
pub const SAFETY_BUFFER_SECS: i64 = 300;

/// Longest remaining lifetime accepted as plausible (48 hours)
pub const MAX_VALID_DURATION_MS: i64 = 48 * 60 * 60 * 1000;

/// Token as persisted in the cache file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime in seconds as reported by the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Absolute expiry in epoch milliseconds, buffer already applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Successful token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Some issuers send this as a string
    #[serde(default, deserialize_with = "lenient_i64")]
    pub expires_in: Option<i64>,
}

impl TokenRecord {
    /// Stamp an issuer response with its absolute expiry.
    ///
    /// A response without `expires_in` lands in the past and is never valid.
    /// Out-of-range lifetimes saturate, so they fail the validity check
    /// instead of wrapping around.
    pub fn from_issued(issued: IssuedToken, now_ms: i64) -> Self {
        let lifetime_secs = issued.expires_in.unwrap_or(0);
        let expires_at = lifetime_secs
            .saturating_sub(SAFETY_BUFFER_SECS)
            .saturating_mul(1000)
            .saturating_add(now_ms);

        Self {
            access_token: issued.access_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            expires_at: Some(expires_at),
        }
    }

    /// Milliseconds until expiry, negative once expired
    pub fn remaining_ms(&self, now_ms: i64) -> Option<i64> {
        self.expires_at.map(|at| at.saturating_sub(now_ms))
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Decide whether a record can be used at `now_ms`. Performs no I/O.
pub fn is_token_valid(record: Option<&TokenRecord>, now_ms: i64) -> bool {
    let Some(record) = record else {
        return false;
    };
    let Some(expires_at) = record.expires_at else {
        return false;
    };

    if now_ms >= expires_at {
        return false;
    }

    let remaining = expires_at.saturating_sub(now_ms);
    if remaining > MAX_VALID_DURATION_MS {
        log::warn!(
            "Cached token claims {}h of remaining lifetime; treating cache entry as corrupt",
            remaining / (60 * 60 * 1000)
        );
        return false;
    }

    true
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Str(String),
    }

    match Option::<NumOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrString::Num(n)) => Ok(Some(n)),
        Some(NumOrString::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
