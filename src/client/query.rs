//! Authenticated query client
//!
//! Sends exactly one `POST {base}/api/query` per call. Completed HTTP
//! exchanges are always returned as data, whatever the status; only transport
//! failures, timeouts and non-JSON bodies surface as errors.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::QueryApi;
use super::models::{EMPTY_RESPONSE_ERROR, EMPTY_RESPONSE_MESSAGE, QueryRequest};
use crate::config::HarnessConfig;
use crate::error::{ApiError, ConfigError, Error, Result};

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Sent as `Authorization: Bearer <token>`
    pub token: Option<String>,
    /// Sent verbatim as `Authorization`, wins over `token`
    pub auth_header_override: Option<String>,
    /// Falls back to the client default when unset
    pub count: Option<u32>,
    pub index_name: Option<String>,
    /// Extra headers added on top of the JSON content type
    pub custom_headers: Vec<(String, String)>,
}

impl QueryOptions {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header_override = Some(value.into());
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }
}

/// Result of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed body, or the synthesized empty-response error
    pub data: Value,
    pub elapsed: Duration,
}

impl QueryOutcome {
    /// Decode `data` into a typed body
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected response shape: {}", e)).into()
        })
    }

    /// `error` field of the body, if any
    pub fn error_code(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }

    /// Seconds from the `retry-after` header
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Client for the query endpoint
pub struct QueryClient {
    http: HttpClient,
    base_url: String,
    default_count: u32,
    default_index: Option<String>,
    timeout: Duration,
}

impl QueryClient {
    /// Create a client for `base_url` (the part before `/api/query`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_count: 3,
            default_index: None,
            timeout,
        })
    }

    /// Create a client from harness configuration
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let mut client = Self::new(config.require_endpoint()?, config.request_timeout())?;
        client.default_count = config.default_count;
        client.default_index = config.default_index.clone();
        Ok(client)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/query", self.base_url)
    }
}

#[async_trait]
impl QueryApi for QueryClient {
    async fn query(&self, query: &str, options: &QueryOptions) -> Result<QueryOutcome> {
        let headers = build_headers(options)?;
        let body = QueryRequest {
            query,
            count: options.count.unwrap_or(self.default_count),
            index_name: options
                .index_name
                .as_deref()
                .or(self.default_index.as_deref()),
        };

        let started = Instant::now();
        let response = self
            .http
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::from_transport(e, "query request", self.timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, "query request", self.timeout))?;
        let elapsed = started.elapsed();

        log::debug!("POST {} -> {} in {:?}", self.endpoint(), status, elapsed);

        Ok(QueryOutcome {
            status,
            headers,
            data: normalize_body(&text)?,
            elapsed,
        })
    }
}

/// Build request headers. `Authorization` is decided last: the raw override,
/// else a bearer token, else no header at all.
pub fn build_headers(options: &QueryOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &options.custom_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Invalid(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Invalid(format!("header value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }

    let authorization = match (&options.auth_header_override, &options.token) {
        (Some(raw), _) => Some(raw.clone()),
        (None, Some(token)) => Some(format!("Bearer {}", token)),
        (None, None) => None,
    };

    match authorization {
        Some(value) => {
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| ConfigError::Invalid(format!("authorization header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }

    Ok(headers)
}

/// Parse a response body. Blank bodies become a synthetic error object.
pub fn normalize_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(json!({
            "error": EMPTY_RESPONSE_ERROR,
            "message": EMPTY_RESPONSE_MESSAGE,
        }));
    }

    serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e)).into())
}
