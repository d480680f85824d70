//! Error types for the dashboard data layer

use thiserror::Error;

/// Errors surfaced by the fetch client and upstream parsing
///
/// These never reach dashboard callers directly: the
/// [`MarketDataService`](crate::service::MarketDataService) turns every one of
/// them into synthetic data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network request failed before a response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An attempt exceeded the per-attempt timeout
    #[error("Request timeout")]
    Timeout,

    /// Transport failure reported by a non-reqwest transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not valid JSON for the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request could not be built, so nothing was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response parsed but required fields were missing or inconsistent
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Creates an InvalidResponse error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Creates an InvalidRequest error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether a further attempt could succeed
    ///
    /// Failures without a response, 429 and 5xx are retryable. Every other
    /// status is final, as are payload errors and requests that could not
    /// be built.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout | FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => crate::backoff::is_retryable_status(*status),
            FetchError::InvalidRequest(_) | FetchError::Json(_) | FetchError::InvalidResponse(_) => {
                false
            }
        }
    }
}

/// Errors raised while building a [`ServiceConfig`](crate::config::ServiceConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl ConfigError {
    /// Creates an InvalidValue error for variable `name`
    pub fn invalid_value(name: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Convenience alias for fetch results
pub type FetchResult<T> = std::result::Result<T, FetchError>;
