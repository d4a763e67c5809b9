//! Retrieval of listing pages and documents over HTTP.
//!
//! Every call goes through a [`RetryPolicy`] (transient failures only) and a
//! per-host [`RateLimiter`]. Callers see a plain [`FetchError`] once retries
//! are exhausted.

mod client;
pub mod constants;
mod error;
pub mod rate_limiter;
mod retry;

pub use client::{FetchedBody, Fetcher, HttpFetcher, fetch_document};
pub use error::FetchError;
pub use rate_limiter::RateLimiter;
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error, with_retry,
};
