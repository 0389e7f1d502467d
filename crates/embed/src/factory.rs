//! Embedding client factory.
//!
//! Creates the embedding client named by the add-on settings.

use crate::client::EmbeddingClient;
use crate::providers::{HashingEmbedder, OllamaClient};
use ankivec_core::{AddonConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an embedding client based on the configured provider.
///
/// # Arguments
/// * `config` - Add-on settings; `provider`, `ollama_host` and
///   `request_timeout_secs` are consulted
///
/// # Errors
/// Returns [`AppError::Config`] if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_client(config: &AddonConfig) -> AppResult<Arc<dyn EmbeddingClient>> {
    match config.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = match config.request_timeout_secs {
                Some(secs) => {
                    OllamaClient::with_timeout(&config.ollama_host, Duration::from_secs(secs))?
                }
                None => OllamaClient::with_base_url(&config.ollama_host),
            };
            tracing::debug!("Using Ollama embeddings at {}", client.base_url());
            Ok(Arc::new(client))
        }
        "hashing" => {
            tracing::debug!("Using offline hashing embeddings");
            Ok(Arc::new(HashingEmbedder::default()))
        }
        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, hashing",
            other
        ))),
    }
}
