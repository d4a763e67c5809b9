//! HTTP retrieval of listing pages and documents.
//!
//! [`HttpFetcher`] is created once per run and shared; `reqwest::Client`
//! pools connections internally and is safe to use from many tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use super::error::FetchError;
use super::rate_limiter::RateLimiter;
use super::retry::{RetryPolicy, with_retry};
use crate::user_agent;

/// Response body plus the declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    /// Raw response bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, lowercased and without parameters.
    pub content_type: Option<String>,
}

impl FetchedBody {
    /// Returns true when the server declared an HTML body.
    #[must_use]
    pub fn is_html(&self) -> bool {
        matches!(
            self.content_type.as_deref(),
            Some("text/html" | "application/xhtml+xml")
        )
    }

    /// Decodes the body as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Retrieves bytes for a URL.
///
/// Implementations apply their own retry policy; a returned error is final.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, returning the body on a 2xx response.
    async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

/// Fetches a document and rejects responses that cannot be one.
///
/// An HTML body served in place of a binary document (error or login page)
/// and an empty body are both [`FetchError::Malformed`].
///
/// # Errors
///
/// Returns the fetcher's error, or `Malformed` for unusable bodies.
pub async fn fetch_document(fetcher: &dyn Fetcher, url: &str) -> Result<FetchedBody, FetchError> {
    let body = fetcher.fetch(url).await?;
    if body.is_html() {
        return Err(FetchError::malformed(url, "HTML page served instead of document"));
    }
    if body.bytes.is_empty() {
        return Err(FetchError::malformed(url, "empty response body"));
    }
    Ok(body)
}

/// reqwest-backed [`Fetcher`] with per-host spacing and bounded retry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher with the default 60 second per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(rate_limiter: Arc<RateLimiter>, retry_policy: RetryPolicy) -> Result<Self, FetchError> {
        Self::with_timeout(rate_limiter, retry_policy, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a fetcher with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn with_timeout(
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent::default_user_agent())
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .gzip(true)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        Ok(Self {
            client,
            rate_limiter,
            retry_policy,
        })
    }

    /// Performs a single attempt without retry.
    async fn fetch_once(&self, url: &str) -> Result<FetchedBody, FetchError> {
        self.rate_limiter.acquire(url).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        // Body read failures (reset mid-body) are transport errors too.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        debug!(url, bytes = bytes.len(), content_type = ?content_type, "fetched");

        Ok(FetchedBody {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(max_attempts = self.retry_policy.max_attempts()))]
    async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::invalid_url(url));
        }
        with_retry(&self.retry_policy, url, |_| self.fetch_once(url)).await
    }
}
