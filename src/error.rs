//! Error types for DeFi Insight

use std::io;

use thiserror::Error;

/// Result type alias for DeFi Insight
pub type Result<T> = std::result::Result<T, Error>;

/// DeFi Insight errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream answered with a non-2xx status other than 429
    #[error("Upstream error {status} from {url}: {message}")]
    Upstream {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body excerpt or reason phrase
        message: String,
    },

    /// Upstream answered 429
    #[error("Rate limit exceeded at {url}")]
    RateLimited {
        /// Requested URL
        url: String,
        /// Raw `retry-after` header, if any
        retry_after: Option<String>,
    },

    /// Response lacks a structure the caller cannot default
    #[error("Malformed response from {source_name}: {message}")]
    Schema {
        /// Upstream that produced the response
        source_name: String,
        /// What was missing
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error (connect failures, deadlines, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a schema error
    pub fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this is an HTTP 429
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Raw `retry-after` header of a 429
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::RateLimited { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
