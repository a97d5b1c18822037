//! Application state for the RAG server
//!
//! Built once at startup and shared read-only by every request handler.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerComposer;
use crate::index::EmbeddingIndex;
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::providers::{create_embedder, create_llm, EmbeddingProvider, LlmProvider};
use crate::retrieval::Retriever;
use crate::types::RawDocument;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Loaded documents, in loader order
    documents: Vec<RawDocument>,
    /// Question to chunks
    retriever: Retriever,
    /// Chunks to answer
    composer: AnswerComposer,
}

impl AppState {
    /// Load the corpus, then load or build the index, using the configured providers
    pub async fn new(config: RagConfig) -> Result<Self> {
        let embedder = create_embedder(&config.embeddings)?;
        let llm = create_llm(&config.llm)?;
        Self::with_providers(config, embedder, llm).await
    }

    /// Same as [`AppState::new`] with explicit providers
    pub async fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let loader = DocumentLoader::new(config.corpus.parallel_files);
        let docs_dir = config.corpus.docs_dir.clone();
        let documents = tokio::task::spawn_blocking(move || loader.load(&docs_dir))
            .await
            .map_err(|e| Error::internal(format!("Document loading task failed: {}", e)))?;

        let index = Self::load_or_build_index(&config, &documents, embedder).await?;
        Ok(Self::from_parts(config, documents, index, llm))
    }

    /// Assemble state from already prepared parts
    pub fn from_parts(
        config: RagConfig,
        documents: Vec<RawDocument>,
        index: EmbeddingIndex,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let retriever = Retriever::new(index, config.retrieval.top_k);
        let composer = AnswerComposer::new(llm, config.llm.max_output_tokens);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                retriever,
                composer,
            }),
        }
    }

    async fn load_or_build_index(
        config: &RagConfig,
        documents: &[RawDocument],
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<EmbeddingIndex> {
        let path = config.index.storage_path.clone();

        if path.exists() && !config.index.rebuild {
            let loaded = tokio::task::spawn_blocking(move || EmbeddingIndex::load(&path, embedder))
                .await
                .map_err(|e| Error::internal(format!("Index loading task failed: {}", e)))??;
            tracing::info!("Loaded index from {}", config.index.storage_path.display());
            return Ok(loaded);
        }

        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
        let chunks = chunker.chunk_documents(documents);
        let index = EmbeddingIndex::build(embedder, chunks).await?;

        let to_persist = index.clone();
        let persisted = tokio::task::spawn_blocking(move || to_persist.persist(&path))
            .await
            .map_err(|e| Error::internal(format!("Index persist task failed: {}", e)))?;

        match persisted {
            Ok(_) => tracing::info!("Built & saved new index ({} chunks)", index.len()),
            Err(e) => tracing::warn!("{}; serving the in-memory index only", e),
        }
        Ok(index)
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Loaded documents
    pub fn documents(&self) -> &[RawDocument] {
        &self.inner.documents
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn composer(&self) -> &AnswerComposer {
        &self.inner.composer
    }

    /// The shared embedding index
    pub fn index(&self) -> &EmbeddingIndex {
        self.inner.retriever.index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::providers::{ChatMessage, HashingEmbedder};
    use async_trait::async_trait;

    struct SilentLlm;

    #[async_trait]
    impl LlmProvider for SilentLlm {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _max_output_tokens: usize,
        ) -> std::result::Result<String, BackendError> {
            Err(BackendError::EmptyResponse)
        }

        async fn health_check(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "silent"
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    fn config(root: &std::path::Path) -> RagConfig {
        let mut config = RagConfig::default();
        config.corpus.docs_dir = root.join("documents");
        config.index.storage_path = root.join("vector_index");
        config
    }

    async fn state(config: RagConfig) -> Result<AppState> {
        AppState::with_providers(config, Arc::new(HashingEmbedder::new(64)), Arc::new(SilentLlm)).await
    }

    #[tokio::test]
    async fn test_builds_and_persists_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir_all(&config.corpus.docs_dir).unwrap();
        std::fs::write(config.corpus.docs_dir.join("a.txt"), "The sky is blue.").unwrap();

        let first = state(config.clone()).await.unwrap();
        assert_eq!(first.documents().len(), 1);
        assert_eq!(first.index().len(), 1);
        assert!(config.index.storage_path.join(crate::index::MANIFEST_FILE).exists());

        let second = state(config).await.unwrap();
        assert_eq!(second.index().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_corpus_indexes_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(config(dir.path())).await.unwrap();

        assert_eq!(state.documents().len(), 1);
        assert_eq!(state.documents()[0].source(), "fallback");
        assert_eq!(state.index().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::create_dir_all(&config.index.storage_path).unwrap();

        assert!(matches!(state(config).await, Err(Error::IndexLoad(_))));
    }

    #[tokio::test]
    async fn test_rebuild_overrides_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        std::fs::create_dir_all(&config.index.storage_path).unwrap();
        config.index.rebuild = true;

        let state = state(config).await.unwrap();
        assert_eq!(state.index().len(), 1);
    }
}
