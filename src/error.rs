//! Comparator error types and failure classification

use thiserror::Error;

use crate::types::ProviderId;

/// Result type for comparator operations
pub type CompareResult<T> = Result<T, CompareError>;

/// Top-level error taxonomy
#[derive(Error, Debug)]
pub enum CompareError {
    /// Missing or invalid configuration, fatal before dispatch
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Precondition violation rejected before any provider call
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A provider request failed after classification (and retries, if any)
    #[error("provider request failed: {provider} - {reason}")]
    Provider {
        provider: ProviderId,
        reason: ApiFailure,
    },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Classified failure from an upstream API call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiFailure {
    /// No credential registered for the provider (fatal, never retried)
    #[error("missing credentials")]
    MissingCredentials,
    /// Authentication failed (invalid API key)
    #[error("authentication failed")]
    AuthenticationFailed,
    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    /// Service temporarily unavailable
    #[error("service unavailable")]
    ServiceUnavailable,
    /// Request timeout
    #[error("request timeout")]
    Timeout,
    /// Network/connection error
    #[error("network error: {0}")]
    NetworkError(String),
    /// Server-side error from the provider (5xx)
    #[error("server error: {0}")]
    ServerError(String),
    /// Invalid request format or parameters (non-retryable 4xx)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Response did not match the expected vendor shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Unknown or unhandled error
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl ApiFailure {
    /// Whether the failure is transient and eligible for automatic retry.
    ///
    /// Rate limits, server errors, and network blips are retried; credential,
    /// validation, and protocol errors are not. Unknown failures fall back to
    /// message-pattern matching.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiFailure::RateLimitExceeded
            | ApiFailure::ServiceUnavailable
            | ApiFailure::Timeout
            | ApiFailure::NetworkError(_)
            | ApiFailure::ServerError(_) => true,
            ApiFailure::MissingCredentials
            | ApiFailure::AuthenticationFailed
            | ApiFailure::InvalidRequest(_)
            | ApiFailure::MalformedResponse(_) => false,
            ApiFailure::Unknown(message) => is_retryable_message(message),
        }
    }

    /// Whether the failure is a configuration problem (missing secret).
    pub fn is_configuration(&self) -> bool {
        matches!(self, ApiFailure::MissingCredentials)
    }

    /// Map an HTTP status code plus response body into a classified failure.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ApiFailure::AuthenticationFailed,
            429 => ApiFailure::RateLimitExceeded,
            503 => ApiFailure::ServiceUnavailable,
            400..=499 => ApiFailure::InvalidRequest(format!("HTTP {status}: {body}")),
            _ => ApiFailure::ServerError(format!("HTTP {status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiFailure::Timeout
        } else if err.is_connect() || err.is_request() {
            ApiFailure::NetworkError(err.to_string())
        } else if err.is_decode() {
            ApiFailure::MalformedResponse(err.to_string())
        } else {
            ApiFailure::Unknown(err.to_string())
        }
    }
}

/// Message patterns that indicate a transient upstream condition.
const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "reset",
    "econnreset",
    "etimedout",
    "econnrefused",
    "connection refused",
    "rate limit",
    "too many requests",
    "temporarily unavailable",
    "internal server error",
    "backend error",
];

fn is_retryable_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    RETRYABLE_PATTERNS.iter().any(|p| lowered.contains(p))
}
