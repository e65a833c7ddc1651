//! Query endpoint request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/query`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<&'a str>,
}

/// Successful (200) query response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,

    pub query: String,

    #[serde(default)]
    pub index: Option<String>,

    #[serde(default)]
    pub count: Option<u32>,

    #[serde(default)]
    pub results: Vec<SearchResult>,

    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One retrieved passage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub metadata: Value,

    #[serde(default)]
    pub score: Option<f64>,
}

/// Quota consumption reported with successful responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    pub monthly_limit: i64,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub percent_used: Option<f64>,
}

/// Error body returned with 4xx/5xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(default)]
    pub message: Option<String>,

    /// Present on quota rejections (429)
    #[serde(default)]
    pub quota: Option<QuotaInfo>,
}

/// Quota block of a 429 body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

/// `error` code synthesized when the server sends no body
pub const EMPTY_RESPONSE_ERROR: &str = "empty_response";

/// `message` synthesized when the server sends no body
pub const EMPTY_RESPONSE_MESSAGE: &str = "Server returned empty response";
