//! Client-side request pacing for bursts
//!
//! Unpaced bursts are the point when probing the gateway's rate limit; a
//! pace is only applied when the caller asks for one.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

/// Optional requests-per-second limiter
pub struct RequestPacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestPacer {
    pub fn new(rate_per_sec: Option<NonZeroU32>) -> Self {
        Self {
            limiter: rate_per_sec.map(|rate| {
                debug!("Pacing requests at {}/s", rate);
                // Burst of one so requests are evenly spaced from the start
                RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN))
            }),
        }
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait for the next slot; returns immediately when unpaced
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_unpaced_never_waits() {
        let pacer = RequestPacer::new(None);
        assert!(!pacer.is_paced());

        let started = Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_paced_spreads_requests() {
        let pacer = RequestPacer::new(NonZeroU32::new(10));
        assert!(pacer.is_paced());

        let started = Instant::now();
        // First slot is immediate; the next two cost ~100ms each
        for _ in 0..3 {
            pacer.wait().await;
        }
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
