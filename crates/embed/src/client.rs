//! Embedding client abstraction.
//!
//! This module defines the core abstraction for turning text into vectors.

use ankivec_core::{AppError, AppResult};

/// Trait for embedding backends.
///
/// This trait abstracts the underlying embedding runtime (Ollama, a local
/// hashing model, ...) behind one call: one vector per input text, in input
/// order. Implementations classify failures as
/// [`AppError::ServiceUnavailable`] when the backend cannot be reached,
/// [`AppError::ModelNotFound`] when the model is not installed, and
/// [`AppError::Embedding`] for everything else.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "hashing").
    fn provider_name(&self) -> &str;

    /// Embed a batch of texts with the named model.
    ///
    /// # Arguments
    /// * `model` - Model identifier known to the backend
    /// * `texts` - Inputs; an empty slice yields an empty result
    ///
    /// # Returns
    /// Exactly one vector per input, in the same order
    async fn embed(&self, model: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single text (convenience method).
    async fn embed_one(&self, model: &str, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed(model, &[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    /// Verify the backend is reachable and the model is installed.
    async fn probe(&self, model: &str) -> AppResult<()> {
        self.embed_one(model, "").await.map(|_| ())
    }
}

/// Check that a backend returned one vector per input.
pub(crate) fn ensure_count(expected: usize, embeddings: &[Vec<f32>]) -> AppResult<()> {
    if embeddings.len() != expected {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    Ok(())
}
