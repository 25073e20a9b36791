//! Error types shared across warraq crates.

use std::fmt;

/// Result type alias for warraq operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the warraq pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model provider error (API call failed, rate limited, etc.)
    #[error("model error: {model}: {message}")]
    Model { model: String, message: String },

    /// Every model in a cascade failed for a task with no safe fallback.
    #[error("model cascade exhausted after {attempts} attempts: {message}")]
    Exhausted { attempts: usize, message: String },

    /// Rate limit / quota error from an external service.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Document extraction error (native text and OCR both failed).
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Document registry error.
    #[error("registry error: {0}")]
    Registry(String),

    /// Vector store error.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// RAG retrieval error.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Invalid input or configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a model provider error.
    pub fn model(model: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Model {
            model: model.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a cascade exhaustion error.
    pub fn exhausted(attempts: usize, message: impl fmt::Display) -> Self {
        Self::Exhausted {
            attempts,
            message: message.to_string(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl fmt::Display) -> Self {
        Self::RateLimited(message.to_string())
    }

    /// Creates an extraction error.
    pub fn extraction(message: impl fmt::Display) -> Self {
        Self::Extraction(message.to_string())
    }

    /// Creates a registry error.
    pub fn registry(message: impl fmt::Display) -> Self {
        Self::Registry(message.to_string())
    }

    /// Creates a vector store error.
    pub fn vector_store(message: impl fmt::Display) -> Self {
        Self::VectorStore(message.to_string())
    }

    /// Creates an embedding error.
    pub fn embedding(message: impl fmt::Display) -> Self {
        Self::Embedding(message.to_string())
    }

    /// Creates a retrieval error.
    pub fn retrieval(message: impl fmt::Display) -> Self {
        Self::Retrieval(message.to_string())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl fmt::Display) -> Self {
        Self::InvalidInput(message.to_string())
    }

    /// Returns true if this error is worth retrying against another model.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Model { .. } | Self::RateLimited(_) | Self::Io(_)
        )
    }

    /// Returns true if this error is a quota/rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}
