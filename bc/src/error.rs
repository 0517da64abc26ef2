//! Error taxonomy for the board client

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the board client.
///
/// Transient conditions (429, 401, 5xx, connectivity) are retried inside the
/// client and only reach the caller once retries are exhausted. Logical
/// errors are never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credential material is missing or inconsistent. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A request that is malformed before it ever hits the wire.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-retryable API failure, or a retryable status that exhausted its
    /// retry budget.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// 429 responses persisted past the retry ceiling. Carries the last
    /// server-provided Retry-After value.
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Connectivity failure with no HTTP response, retries exhausted.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
