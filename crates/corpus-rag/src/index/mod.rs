//! Embedding index: an embedding provider bound to the vectors it produced
//!
//! The index is built once (or loaded) at startup and is read-only afterwards.
//! Queries share it through an `Arc` without locking.

mod storage;
mod vectors;

pub use storage::{IndexManifest, FORMAT_VERSION, MANIFEST_FILE, PAYLOAD_FILE};
pub use vectors::VectorIndex;

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, SearchResult};

/// A vector index together with the embedding function that built it
#[derive(Clone)]
pub struct EmbeddingIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<VectorIndex>,
}

impl EmbeddingIndex {
    /// Embed every chunk and index it. Zero chunks yield an empty index.
    pub async fn build(embedder: Arc<dyn EmbeddingProvider>, chunks: Vec<Chunk>) -> Result<Self> {
        let mut index = VectorIndex::new(embedder.dimensions());

        if !chunks.is_empty() {
            tracing::info!("Embedding {} chunks with {}", chunks.len(), embedder.model_id());
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;

            if embeddings.len() != chunks.len() {
                return Err(Error::embedding(format!(
                    "Provider returned {} embeddings for {} chunks",
                    embeddings.len(),
                    chunks.len()
                )));
            }

            for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
                index.insert(chunk, embedding)?;
            }
        }

        tracing::info!("Built index with {} chunks", index.len());
        Ok(Self {
            embedder,
            vectors: Arc::new(index),
        })
    }

    /// Persist vectors and chunk metadata under `path`
    pub fn persist(&self, path: &Path) -> Result<IndexManifest> {
        storage::write_index(path, self.embedder.model_id(), &self.vectors)
    }

    /// Load a persisted index, refusing one built in another embedding space
    pub fn load(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let (manifest, index) = storage::read_index(path)?;

        if manifest.model_id != embedder.model_id() {
            return Err(Error::index_load(format!(
                "{} was built with embedding model '{}' but '{}' is configured",
                path.display(),
                manifest.model_id,
                embedder.model_id()
            )));
        }
        if manifest.dimensions != embedder.dimensions() {
            return Err(Error::index_load(format!(
                "{} holds {}-dimensional vectors but the embedder produces {}",
                path.display(),
                manifest.dimensions,
                embedder.dimensions()
            )));
        }

        tracing::info!(
            "Loaded index with {} chunks from {} (built {})",
            manifest.count,
            path.display(),
            manifest.created_at.to_rfc3339()
        );
        Ok(Self {
            embedder,
            vectors: Arc::new(index),
        })
    }

    /// Top `k` chunks most similar to `text`, best first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;
        let vectors = Arc::clone(&self.vectors);

        tokio::task::spawn_blocking(move || vectors.search(&embedding, k))
            .await
            .map_err(|e| Error::internal(format!("Search task failed: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn dimensions(&self) -> usize {
        self.vectors.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::types::DocumentMetadata;

    fn embedder(dimensions: usize) -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedder::new(dimensions))
    }

    fn chunks() -> Vec<Chunk> {
        [
            ("sky.txt", "The sky is blue on a clear day."),
            ("grass.txt", "Grass is green in the spring."),
            ("sea.md", "The sea reflects the blue sky."),
            ("rust.rst", "Rust has ownership and borrowing."),
        ]
        .iter()
        .enumerate()
        .map(|(i, (source, text))| Chunk::new(*text, DocumentMetadata::new(*source), i as u32))
        .collect()
    }

    #[tokio::test]
    async fn test_query_ranks_matching_chunk_first() {
        let index = EmbeddingIndex::build(embedder(256), chunks()).await.unwrap();
        let results = index.query("What color is the sky?", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert!(["sky.txt", "sea.md"].contains(&results[0].chunk.source()));
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_results() {
        let index = EmbeddingIndex::build(embedder(64), Vec::new()).await.unwrap();
        assert!(index.is_empty());
        for k in [0, 1, 8, 100] {
            assert!(index.query("anything", k).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_persist_then_load_preserves_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");

        let built = EmbeddingIndex::build(embedder(128), chunks()).await.unwrap();
        built.persist(&path).unwrap();
        let loaded = EmbeddingIndex::load(&path, embedder(128)).unwrap();

        assert_eq!(loaded.len(), built.len());
        for question in ["blue sky", "green grass", "ownership"] {
            let before = built.query(question, 3).await.unwrap();
            let after = loaded.query(question, 3).await.unwrap();
            assert_eq!(before.len(), after.len());
            for (b, a) in before.iter().zip(&after) {
                assert_eq!(b.chunk, a.chunk);
                assert!((b.score - a.score).abs() < 1e-6);
            }
        }

        let sources: Vec<&str> = loaded.vectors.chunks().iter().map(|c| c.source()).collect();
        assert_eq!(sources, vec!["sky.txt", "grass.txt", "sea.md", "rust.rst"]);
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedding_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");

        EmbeddingIndex::build(embedder(128), chunks())
            .await
            .unwrap()
            .persist(&path)
            .unwrap();

        let result = EmbeddingIndex::load(&path, embedder(64));
        assert!(matches!(result, Err(Error::IndexLoad(_))));
    }
}
