use std::time::Duration;

use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failures talking to the data.gov.in API.
///
/// Rate limiting is deliberately not retried here: interactive flows
/// surface it immediately, and the batch synchronizer owns its own
/// fixed-delay retry policy.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("upstream server error: {0}")]
    Server(String),

    #[error("invalid upstream response: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Upstream error pages are not ASCII-only; cut on a char boundary
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server(truncated),
            _ => ApiError::Invalid(format!("status {}: {}", status, truncated)),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Invalid(err.to_string())
        } else {
            // Timeouts, connect failures and everything else on the wire
            ApiError::Unavailable(err.to_string())
        }
    }
}

/// Fixed delay the batch synchronizer waits before its single retry
/// after an upstream 429.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);
