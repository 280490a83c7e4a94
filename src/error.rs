//! Error types for nimbus
//!
//! Every public API returns `Result<T, Error>`. Provider responses are
//! classified here once, by the request executor, so the pagination and
//! queue layers only ever match on typed variants.

use thiserror::Error;

/// The main error type for nimbus
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Provider Responses
    // ============================================================================
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {message}")]
    Malformed { message: String },

    // ============================================================================
    // Claim Protocol
    // ============================================================================
    #[error("Message '{message_id}' is not held by claim '{claim_id}'")]
    ClaimMismatch {
        message_id: String,
        claim_id: String,
        /// The claim currently holding the message, when the provider reports it
        held_by: Option<String>,
    },

    #[error("Message '{message_id}' is not claimed")]
    NotClaimed { message_id: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Usage Errors
    // ============================================================================
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a claim mismatch error
    pub fn claim_mismatch(
        message_id: impl Into<String>,
        claim_id: impl Into<String>,
        held_by: Option<String>,
    ) -> Self {
        Self::ClaimMismatch {
            message_id: message_id.into(),
            claim_id: claim_id.into(),
            held_by,
        }
    }

    /// Create a not-claimed error
    pub fn not_claimed(message_id: impl Into<String>) -> Self {
        Self::NotClaimed {
            message_id: message_id.into(),
        }
    }

    /// Classify a non-success HTTP status
    ///
    /// `retry_after` is the parsed `Retry-After` header, used for 429s.
    pub fn from_status(status: u16, body: impl Into<String>, retry_after: Option<u64>) -> Self {
        let body = body.into();
        match status {
            401 => Self::Unauthorized { message: body },
            403 => Self::Forbidden { message: body },
            404 => Self::NotFound { resource: body },
            429 => Self::RateLimited {
                retry_after_seconds: retry_after.unwrap_or(60),
            },
            500..=599 => Self::ServerError { status, body },
            _ => Self::HttpStatus { status, body },
        }
    }

    /// Check if this error means the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is retryable
    ///
    /// The core never retries; this is consulted by the HTTP executor only.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_)
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::ServerError { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

/// Result type alias for nimbus
pub type Result<T> = std::result::Result<T, Error>;
