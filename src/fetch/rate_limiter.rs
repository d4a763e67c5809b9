//! Per-host request spacing.
//!
//! The listing site is walked sequentially with a fixed delay between requests
//! to the same host. Requests to different hosts do not wait for each other.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hansard_core::fetch::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1500)));
//!
//! // First request proceeds immediately
//! limiter.acquire("https://parliament.example/hansard?page=0").await;
//!
//! // Second request to the same host waits for the remaining delay
//! limiter.acquire("https://parliament.example/hansard?page=1").await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Warning threshold for cumulative delay per host.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(300);

/// Per-host rate limiter, shared behind `Arc` across tasks.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between requests to the same host.
    delay: Duration,

    /// Whether rate limiting is disabled.
    disabled: bool,

    /// Per-host state. Entries are `Arc`ed so the `DashMap` shard lock is
    /// released before awaiting on the inner mutex.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// `None` until the first request to this host.
    last_request: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a rate limiter enforcing `delay` between requests to the same host.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = delay.as_millis()))]
    pub fn new(delay: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            delay,
            disabled: delay.is_zero(),
            hosts: DashMap::new(),
        }
    }

    /// Creates a rate limiter that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            delay: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Waits until a request to `url`'s host is allowed, then records it.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let wait = self.delay.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(wait);

                debug!(
                    host = %host,
                    delay_ms = wait.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying request delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(wait) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "request spacing has added over five minutes to this run"
                    );
                }

                tokio::time::sleep(wait).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

/// Extracts the lowercase host from a URL, or `"unknown"` for malformed URLs.
///
/// ```
/// use hansard_core::fetch::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://Parliament.example/hansard"), "parliament.example");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
