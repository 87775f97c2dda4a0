//! Error types for the storefront sync layer.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced through cache entries and mutation states.
///
/// Entries are shared between every subscriber of a key, so the error is
/// `Clone` and carries rendered messages instead of transport error values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Transport failure: connection refused, reset, TLS, body read.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a structured error payload.
    #[error("Application error: {message}")]
    Application {
        status: Option<u16>,
        message: String,
    },

    /// The session is missing or lacks permission; the user must sign in again.
    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// The payload did not have the shape required for its resource.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A fetch attempt exceeded its configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// A mutation was re-invoked while its previous invocation was pending.
    #[error("Mutation '{0}' is already in progress")]
    MutationPending(String),

    /// The owning controller was shut down.
    #[error("Synchronization controller has shut down")]
    Shutdown,
}

impl SyncError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an application error from an optional HTTP status and message
    pub fn application(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(status: u16, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// HTTP status if the server answered with one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Application { status, .. } => *status,
            Self::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether views should send the user back to login.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether a fetch that failed with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Application {
                status: Some(status),
                ..
            } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_transport_failures_are_retryable() {
        assert!(SyncError::network("connection reset").is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::application(Some(503), "unavailable").is_retryable());
        assert!(SyncError::application(Some(429), "slow down").is_retryable());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!SyncError::application(Some(404), "Product not found").is_retryable());
        assert!(!SyncError::application(None, "bad input").is_retryable());
        assert!(!SyncError::decode("missing field `price`").is_retryable());
        assert!(!SyncError::MutationPending("cart".into()).is_retryable());
        assert!(!SyncError::unauthorized(401, "No token provided").is_retryable());
    }

    #[test]
    fn status_code_only_for_application_errors() {
        assert_eq!(
            SyncError::application(Some(401), "Unauthorized").status_code(),
            Some(401)
        );
        assert_eq!(SyncError::Timeout.status_code(), None);
        let err = SyncError::unauthorized(403, "Admins only");
        assert_eq!(err.status_code(), Some(403));
        assert!(err.requires_reauth());
        assert!(!SyncError::application(Some(400), "Out of stock").requires_reauth());
    }
}
