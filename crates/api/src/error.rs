//! Error types for the storefront API crate.

use storefront_core::SyncError;
use thiserror::Error;

/// Result type alias for storefront API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Retry policy class for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors that can occur while talking to the storefront server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error payload returned by the server (`{error}` or `{message}`)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (unknown resource key, empty slug, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ApiRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => ApiRetryClass::ReauthRequired,
                408 | 429 => ApiRetryClass::Retryable,
                500..=599 => ApiRetryClass::Retryable,
                _ => ApiRetryClass::Permanent,
            },
            Self::Http(_) => ApiRetryClass::Retryable,
            Self::Json(_) => ApiRetryClass::Permanent,
            Self::InvalidRequest(_) => ApiRetryClass::Permanent,
        }
    }
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        let class = err.retry_class();
        match err {
            ApiError::Http(e) if e.is_timeout() => SyncError::Timeout,
            ApiError::Http(e) => SyncError::network(e.to_string()),
            ApiError::Json(e) => SyncError::decode(e.to_string()),
            ApiError::Api { status, message } if class == ApiRetryClass::ReauthRequired => {
                SyncError::unauthorized(status, message)
            }
            ApiError::Api { status, message } => SyncError::application(Some(status), message),
            ApiError::InvalidRequest(message) => SyncError::application(None, message),
        }
    }
}
