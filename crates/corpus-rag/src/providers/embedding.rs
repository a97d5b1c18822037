//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use std::sync::Arc;

use super::{HashingEmbedder, OllamaEmbedder};
use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
/// - `HashingEmbedder`: Deterministic feature hashing, no service required
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every produced vector
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding space, recorded alongside persisted vectors
    fn model_id(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Build the configured embedding provider
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(config)?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.dimensions)),
    };

    tracing::info!(
        "Embedding provider: {} (model: {}, dimensions: {})",
        embedder.name(),
        embedder.model_id(),
        embedder.dimensions()
    );
    Ok(embedder)
}
