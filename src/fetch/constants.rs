//! Constants for the fetch module (timeouts, request spacing).

use std::time::Duration;

/// HTTP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-request timeout covering headers and body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between requests to the same host.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1500);
