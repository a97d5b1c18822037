//! Question-to-chunks retrieval over the shared embedding index

use crate::error::Result;
use crate::index::EmbeddingIndex;
use crate::types::SearchResult;

/// Default number of chunks retrieved per question
pub const DEFAULT_TOP_K: usize = 8;

/// Thin query interface with a fixed `k`
#[derive(Clone)]
pub struct Retriever {
    index: EmbeddingIndex,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: EmbeddingIndex, top_k: usize) -> Self {
        Self { index, top_k }
    }

    /// Retrieve the configured number of chunks for `question`
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        self.retrieve_k(question, self.top_k).await
    }

    /// Retrieve up to `k` chunks ranked by descending similarity
    pub async fn retrieve_k(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let results = self.index.query(question, k).await?;
        tracing::debug!("Retrieved {} chunks for question", results.len());
        Ok(results)
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}
