//! Embedding integration crate for ankivec.
//!
//! This crate provides a provider-agnostic abstraction for turning note and
//! query text into vectors. It supports multiple backends through a unified
//! trait-based interface.
//!
//! # Providers
//! - **Ollama**: Local model runtime (default)
//! - **Hashing**: Deterministic offline embedder
//!
//! # Example
//! ```no_run
//! use ankivec_embed::{EmbeddingClient, OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::default();
//! let vector = client.embed_one("nomic-embed-text", "search_query: animals").await?;
//! println!("{} dimensions", vector.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::EmbeddingClient;
pub use factory::create_client;
pub use providers::{HashingEmbedder, OllamaClient};
