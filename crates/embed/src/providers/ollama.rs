//! Ollama embedding client.
//!
//! Talks to a local Ollama runtime through its batch embedding endpoint.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md
//!
//! # Example
//! ```no_run
//! use ankivec_embed::{EmbeddingClient, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::with_base_url("http://localhost:11434");
//! let vectors = client
//!     .embed("nomic-embed-text", &["search_document: hello".to_string()])
//!     .await?;
//! assert_eq!(vectors.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::client::{ensure_count, EmbeddingClient};
use ankivec_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default Ollama API base URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";

/// Maximum attempts for requests that fail to reach the service
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request payload for the Ollama embed API
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from the Ollama embed API
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Error response from the Ollama API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Ollama embedding client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,

    /// Base URL for Ollama API
    base_url: String,

    /// Attempts per request when the service is unreachable
    max_retries: u32,
}

impl OllamaClient {
    /// Create a client with no request timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url.into()),
            max_retries: MAX_RETRIES,
        }
    }

    /// Create a client whose requests fail after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url.into()),
            max_retries: MAX_RETRIES,
        })
    }

    /// Override how many attempts are made when the service is unreachable.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed with retry on connectivity failures only.
    ///
    /// A missing model or a malformed response will not fix itself, so those
    /// are returned on the first attempt.
    async fn embed_with_retries(&self, model: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            match self.embed_once(model, texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(AppError::ServiceUnavailable(msg)) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(AppError::ServiceUnavailable(msg));
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Ollama unreachable (attempt {}/{}), retrying in {}ms",
                        attempt, self.max_retries, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single request, no retries.
    #[instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_once(&self, model: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let request = EmbedRequest {
            model,
            input: texts,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::ServiceUnavailable(format!("cannot reach Ollama at {}: {}", self.base_url, e))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);

            return Err(classify_api_error(model, status, &message));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        ensure_count(texts.len(), &body.embeddings)?;

        debug!(
            "Received {} embeddings of dimension {}",
            body.embeddings.len(),
            body.embeddings.first().map(Vec::len).unwrap_or(0)
        );

        Ok(body.embeddings)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, texts), fields(provider = "ollama", batch_size = texts.len()))]
    async fn embed(&self, model: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.embed_with_retries(model, texts).await
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Map an Ollama error response onto the error taxonomy.
fn classify_api_error(model: &str, status: reqwest::StatusCode, message: &str) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("model") && lower.contains("not found") {
        return AppError::ModelNotFound {
            model: model.to_string(),
        };
    }

    AppError::Embedding(format!("Ollama API error ({}): {}", status, message))
}
