//! Error types for the REST client

use thiserror::Error;

/// Error types for client operations
#[derive(Error, Debug)]
pub enum Error {
    // Network errors
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Establishing a session failed; session state has been rolled back
    #[error("connecting to server failed: {reason}")]
    ConnectionFailed {
        /// What went wrong while connecting
        reason: String,
    },

    /// A session-bound operation was invoked without a connected session
    #[error("not connected to server")]
    NotConnected,

    // Protocol errors
    /// Server rejected the supplied credentials (HTTP 401)
    #[error("unauthorized: {snippet}")]
    Unauthorized {
        /// Truncated response body for diagnostics
        snippet: String,
    },

    /// Server-side failure (HTTP 500)
    #[error("server error: {snippet}")]
    Server {
        /// Truncated response body for diagnostics
        snippet: String,
    },

    /// Unexpected status code or content type
    #[error("protocol error: {reason}")]
    Protocol {
        /// Reason for the protocol violation
        reason: String,
    },

    // Domain errors
    /// Record or schema class absent on the server
    #[error("not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Validation failure or concurrent-modification conflict
    #[error("data error: {reason}")]
    Data {
        /// Reason reported by the server
        reason: String,
    },

    // Caller input errors
    /// Construction-time options failed validation
    #[error("invalid options: {reason}")]
    InvalidOptions {
        /// Which option and why
        reason: String,
    },

    /// Malformed operation argument, detected before any network call
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Which argument and why
        reason: String,
    },

    // Data format errors
    /// Response body failed to decode as JSON
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

// Helper methods for common error construction
impl Error {
    /// Create a connection-failed error
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(snippet: impl Into<String>) -> Self {
        Self::Unauthorized {
            snippet: snippet.into(),
        }
    }

    /// Create a server error
    pub fn server(snippet: impl Into<String>) -> Self {
        Self::Server {
            snippet: snippet.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a data error
    pub fn data(reason: impl Into<String>) -> Self {
        Self::Data {
            reason: reason.into(),
        }
    }

    /// Create an invalid-options error
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
