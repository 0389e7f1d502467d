//! Error types for ankivec.
//!
//! This module defines a unified error enum that covers every failure the
//! sync engine, the embedding client, the vector index and the note store can
//! surface. The variants mirror how callers must react: connectivity failures
//! abort the current operation, embedding failures can be contained per batch,
//! index failures are always fatal to the current operation.

use thiserror::Error;

/// Unified error type for ankivec.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// The embedding backend could not be reached
    #[error(
        "Embedding service unavailable: {0}. Install Ollama from https://ollama.ai and ensure it is running."
    )]
    ServiceUnavailable(String),

    /// The configured embedding model is not installed in the backend
    #[error("Model '{model}' not found. Please run: ollama pull {model}")]
    ModelNotFound { model: String },

    /// Any other embedding failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Note store (host collection) errors
    #[error("Note store error: {0}")]
    NoteStore(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the error means the embedding backend cannot serve requests at
    /// all, as opposed to a failure of one particular request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            AppError::ServiceUnavailable(_) | AppError::ModelNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
