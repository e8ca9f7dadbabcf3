use thiserror::Error;

/// Failures surfaced by a completion request.
///
/// Only [`CompletionError::RateLimited`] is retried; every other variant
/// reaches the caller on the attempt that produced it.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Upstream answered HTTP 429.
    #[error("rate limit exceeded (HTTP {status}): {message}")]
    RateLimited { status: u16, message: String },

    /// The transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// Connection, DNS, TLS or any other request-layer failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success status other than rate limiting (bad key, bad request, 5xx).
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response from upstream: {0}")]
    InvalidResponse(String),

    /// Every permitted attempt was rate limited.
    #[error("gave up after {attempts} rate-limited attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<CompletionError>,
    },
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Self::RetryExhausted { .. })
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
