//! Concurrent query bursts
//!
//! Fires a fixed number of queries with bounded concurrency and tallies what
//! came back. Used to observe the gateway's rate limiting and latency under
//! load; each request is sent once, never retried.

pub mod pacing;

use std::collections::BTreeMap;
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use log::debug;
use reqwest::StatusCode;
use serde::Serialize;

use crate::client::{QueryApi, QueryOptions};
pub use pacing::RequestPacer;

/// Parameters of a burst
#[derive(Debug, Clone)]
pub struct BurstPlan {
    pub requests: usize,
    pub concurrency: usize,
    pub rate_per_sec: Option<NonZeroU32>,
    pub query: String,
}

/// What happened to a single request
#[derive(Debug, Clone)]
enum Sample {
    Completed {
        status: StatusCode,
        elapsed: Duration,
        retry_after: Option<Duration>,
    },
    TimedOut,
    Failed(String),
}

/// Aggregate results of a burst
#[derive(Debug, Clone, Default, Serialize)]
pub struct BurstSummary {
    pub requests: usize,
    /// Completed exchanges keyed by HTTP status
    pub status_counts: BTreeMap<u16, usize>,
    pub timeouts: usize,
    pub errors: usize,
    /// First few transport error messages
    pub error_samples: Vec<String>,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub max_ms: Option<u64>,
    /// Any 429 observed
    pub rate_limited: bool,
    pub max_retry_after_secs: Option<u64>,
    pub wall_ms: u64,
}

impl BurstSummary {
    /// Completed exchanges with this status
    pub fn count(&self, status: StatusCode) -> usize {
        self.status_counts
            .get(&status.as_u16())
            .copied()
            .unwrap_or(0)
    }
}

const MAX_ERROR_SAMPLES: usize = 5;

type SampleFuture<'a> = Pin<Box<dyn Future<Output = Sample> + Send + 'a>>;

/// Run a burst against the query API.
///
/// At most `plan.concurrency` requests are in flight; `progress` advances once
/// per finished request.
pub async fn run_burst(
    client: &dyn QueryApi,
    options: &QueryOptions,
    plan: &BurstPlan,
    progress: &ProgressBar,
) -> BurstSummary {
    let pacer = RequestPacer::new(plan.rate_per_sec);
    let concurrency = plan.concurrency.max(1);
    let started = Instant::now();

    debug!(
        "Starting burst of {} requests, {} concurrent{}",
        plan.requests,
        concurrency,
        if pacer.is_paced() { ", paced" } else { "" }
    );

    let mut pending = 0..plan.requests;
    let mut in_flight: FuturesUnordered<SampleFuture<'_>> = FuturesUnordered::new();
    let mut samples = Vec::with_capacity(plan.requests);

    // Seed initial batch up to the concurrency limit
    for index in pending.by_ref().take(concurrency) {
        in_flight.push(send_one(client, options, &plan.query, &pacer, index));
    }

    // Keep the window full until every request has finished
    while let Some(sample) = in_flight.next().await {
        samples.push(sample);
        progress.inc(1);

        if let Some(index) = pending.next() {
            in_flight.push(send_one(client, options, &plan.query, &pacer, index));
        }
    }

    let mut summary = summarize(&samples);
    summary.requests = plan.requests;
    summary.wall_ms = started.elapsed().as_millis() as u64;
    summary
}

/// One paced request, reduced to a sample
fn send_one<'a>(
    client: &'a dyn QueryApi,
    options: &'a QueryOptions,
    query: &'a str,
    pacer: &'a RequestPacer,
    index: usize,
) -> SampleFuture<'a> {
    Box::pin(async move {
        pacer.wait().await;
        debug!("Sending burst request {}", index);
        match client.query(query, options).await {
            Ok(outcome) => Sample::Completed {
                status: outcome.status,
                elapsed: outcome.elapsed,
                retry_after: outcome.retry_after(),
            },
            Err(e) if e.is_timeout() => Sample::TimedOut,
            Err(e) => Sample::Failed(e.to_string()),
        }
    })
}

fn summarize(samples: &[Sample]) -> BurstSummary {
    let mut summary = BurstSummary::default();
    let mut latencies: Vec<u64> = Vec::new();

    for sample in samples {
        match sample {
            Sample::Completed {
                status,
                elapsed,
                retry_after,
            } => {
                *summary.status_counts.entry(status.as_u16()).or_insert(0) += 1;
                latencies.push(elapsed.as_millis() as u64);

                if *status == StatusCode::TOO_MANY_REQUESTS {
                    summary.rate_limited = true;
                }
                if let Some(secs) = retry_after.map(|d| d.as_secs()) {
                    summary.max_retry_after_secs =
                        Some(summary.max_retry_after_secs.map_or(secs, |m| m.max(secs)));
                }
            }
            Sample::TimedOut => summary.timeouts += 1,
            Sample::Failed(message) => {
                summary.errors += 1;
                if summary.error_samples.len() < MAX_ERROR_SAMPLES {
                    summary.error_samples.push(message.clone());
                }
            }
        }
    }

    latencies.sort_unstable();
    summary.p50_ms = percentile(&latencies, 50);
    summary.p95_ms = percentile(&latencies, 95);
    summary.max_ms = latencies.last().copied();
    summary.requests = samples.len();
    summary
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted: &[u64], pct: usize) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted.get(rank - 1).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::QueryOutcome;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Allows `limit` requests, then answers 429
    struct QuotaGateway {
        limit: usize,
        seen: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl QuotaGateway {
        fn new(limit: usize) -> Self {
            Self {
                limit,
                seen: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryApi for QuotaGateway {
        async fn query(&self, _query: &str, _options: &QueryOptions) -> Result<QueryOutcome> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let n = self.seen.fetch_add(1, Ordering::SeqCst);
            let mut headers = HeaderMap::new();
            let (status, data) = if n < self.limit {
                (StatusCode::OK, json!({"success": true}))
            } else {
                headers.insert("retry-after", HeaderValue::from_static("60"));
                (StatusCode::TOO_MANY_REQUESTS, json!({"error": "rate_limited"}))
            };

            Ok(QueryOutcome {
                status,
                headers,
                data,
                elapsed: Duration::from_millis(10),
            })
        }
    }

    struct TimeoutGateway;

    #[async_trait]
    impl QueryApi for TimeoutGateway {
        async fn query(&self, _query: &str, _options: &QueryOptions) -> Result<QueryOutcome> {
            Err(Error::Timeout {
                operation: "query request",
                after: Duration::from_secs(1),
            })
        }
    }

    fn plan(requests: usize, concurrency: usize) -> BurstPlan {
        BurstPlan {
            requests,
            concurrency,
            rate_per_sec: None,
            query: "q".to_string(),
        }
    }

    #[tokio::test]
    async fn test_burst_counts_statuses_and_rate_limit() {
        let gateway = QuotaGateway::new(6);
        let summary = run_burst(
            &gateway,
            &QueryOptions::with_token("t"),
            &plan(10, 3),
            &ProgressBar::hidden(),
        )
        .await;

        assert_eq!(summary.requests, 10);
        assert_eq!(summary.count(StatusCode::OK), 6);
        assert_eq!(summary.count(StatusCode::TOO_MANY_REQUESTS), 4);
        assert!(summary.rate_limited);
        assert_eq!(summary.max_retry_after_secs, Some(60));
        assert_eq!(summary.p50_ms, Some(10));
    }

    #[tokio::test]
    async fn test_burst_respects_concurrency() {
        let gateway = QuotaGateway::new(100);
        run_burst(
            &gateway,
            &QueryOptions::default(),
            &plan(12, 2),
            &ProgressBar::hidden(),
        )
        .await;

        assert_eq!(gateway.seen.load(Ordering::SeqCst), 12);
        assert!(gateway.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_burst_tallies_timeouts() {
        let summary = run_burst(
            &TimeoutGateway,
            &QueryOptions::default(),
            &plan(4, 4),
            &ProgressBar::hidden(),
        )
        .await;

        assert_eq!(summary.timeouts, 4);
        assert_eq!(summary.errors, 0);
        assert!(summary.status_counts.is_empty());
        assert!(summary.p50_ms.is_none());
    }

    #[tokio::test]
    async fn test_empty_burst() {
        let summary = run_burst(
            &TimeoutGateway,
            &QueryOptions::default(),
            &plan(0, 4),
            &ProgressBar::hidden(),
        )
        .await;
        assert_eq!(summary.requests, 0);
        assert!(!summary.rate_limited);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&values, 50), Some(50));
        assert_eq!(percentile(&values, 95), Some(95));
        assert_eq!(percentile(&[7], 95), Some(7));
        assert_eq!(percentile(&[], 50), None);
    }
}
