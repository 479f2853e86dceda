//! Error types for skald.

pub mod classify;

pub use classify::{Classified, Classifier, ErrorCategory, HeuristicRule, TextMatcher};

use thiserror::Error;

/// Primary error type for all skald operations.
#[derive(Error, Debug)]
pub enum SkaldError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Memory store error: {0}")]
    MemoryStore(String),

    #[error("Missing dependency: {0}")]
    Dependency(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Retries exhausted after {retries} retries ({category}): {source}")]
    RetriesExhausted {
        category: ErrorCategory,
        retries: u32,
        #[source]
        source: Box<SkaldError>,
    },
}

impl SkaldError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkaldError>;
