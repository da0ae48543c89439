//! HTTP Client Utilities
//!
//! Shared HTTP client creation with consistent configuration.

use std::time::Duration;

use super::error::RequestFailure;

/// Create a reqwest HTTP client with explicit request and connect timeouts.
///
/// The client is reused for every request made by one `GoogleClient`,
/// including service account token exchanges.
pub fn create_http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, RequestFailure> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| RequestFailure::Transport(format!("Failed to build HTTP client: {}", e)))
}
