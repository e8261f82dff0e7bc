//! Resilience primitives for the Last.fm boundary.

use std::sync::Arc;

use backon::ExponentialBuilder;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Spaces out requests so that consecutive acquisitions are at least
/// `interval` apart.
///
/// Clones share the same schedule, so the spacing is a global rate across
/// every task holding a clone, not a per-task one. The first acquisition
/// never waits.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    last: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a new `RateLimiter` that allows at most
    /// `requests_per_second` requests per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_interval(Duration::from_millis(
            1000 / u64::from(requests_per_second.max(1)),
        ))
    }

    /// Creates a `RateLimiter` with an explicit spacing between requests.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            last: Arc::new(Mutex::new(None)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request slot is available and claims it.
    pub async fn acquire(&self) {
        // Holding the lock across the sleep queues other callers behind us.
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// Backoff used when retrying a transient history-fetch failure.
pub fn history_backoff(max_retries: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(max_retries)
}
