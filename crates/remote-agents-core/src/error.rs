//! Error taxonomy for the session client.

use thiserror::Error;

/// Errors surfaced by the API client layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials (401/403). Never retried.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Rate limited (429). Caller may implement its own backoff.
    #[error("rate limited: {0}")]
    RateLimit(String),
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other non-2xx response.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Transport/timeout failure.
    #[error("network error: {0}")]
    Network(String),
    /// Response body did not decode as the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for the 404-class error this crate retries on the first
    /// activity-list request (see [`crate::retry`]).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Top-level error type for the session client.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No API key was supplied and none could be found in the environment.
    #[error("missing API key")]
    MissingApiKey,
    /// Authentication rejected by the Service.
    #[error("authentication error: {0}")]
    Authentication(String),
    /// Rate limited by the Service.
    #[error("rate limited: {0}")]
    RateLimit(String),
    /// Any other non-2xx API response.
    #[error("API error: {0}")]
    Api(String),
    /// Transport-level failure (connect, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// A REST payload did not match any known activity or artifact shape.
    #[error("unrecognized payload shape: {0}")]
    Map(String),
    /// A durability failure in the storage layer.
    #[error("storage error: {0}")]
    Storage(String),
    /// A requested action is incompatible with the session's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// `result()` observed a terminal `failed` session state.
    #[error("session failed: {reason:?}")]
    AutomatedSessionFailed { reason: Option<String> },
    /// A source repository lookup found nothing.
    #[error("source not found: {0}")]
    SourceNotFound(String),
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Authentication(msg) => Self::Authentication(msg),
            ApiError::RateLimit(msg) => Self::RateLimit(msg),
            ApiError::NotFound(msg) => Self::Api(format!("not found: {msg}")),
            ApiError::Status { status, body } => Self::Api(format!("status {status}: {body}")),
            ApiError::Network(msg) => Self::Network(msg),
            ApiError::Decode(msg) => Self::Map(msg),
        }
    }
}

impl From<crate::mapper::MapError> for CoreError {
    fn from(err: crate::mapper::MapError) -> Self {
        Self::Map(err.0)
    }
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
