//! RAG query API client

use async_trait::async_trait;

use crate::error::Result;

pub mod models;
pub mod query;

pub use models::{ErrorBody, QueryResponse};
pub use query::{QueryClient, QueryOptions, QueryOutcome};

/// Query endpoint operations
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Send one query. Any completed HTTP exchange is returned as an outcome.
    async fn query(&self, query: &str, options: &QueryOptions) -> Result<QueryOutcome>;
}
