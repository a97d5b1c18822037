//! In-memory vector store with exact cosine search

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, SearchResult};

/// Chunks paired with their unit-length embeddings, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            chunks: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Add a chunk; the vector is L2-normalised before storage
    pub fn insert(&mut self, chunk: Chunk, mut vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        normalize(&mut vector);
        self.chunks.push(chunk);
        self.vectors.push(vector);
        Ok(())
    }

    /// Top `k` chunks by cosine similarity, best first.
    ///
    /// Equal scores keep insertion order so results are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        if k == 0 || self.vectors.is_empty() || query.len() != self.dimensions {
            return Vec::new();
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&query, v)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Every stored vector has the declared dimension and pairs with a chunk
    pub(crate) fn is_consistent(&self) -> bool {
        self.chunks.len() == self.vectors.len()
            && self.vectors.iter().all(|v| v.len() == self.dimensions && v.iter().all(|x| x.is_finite()))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn chunk(source: &str) -> Chunk {
        Chunk::new(format!("text of {}", source), DocumentMetadata::new(source), 0)
    }

    #[test]
    fn test_search_ranks_by_cosine() {
        let mut index = VectorIndex::new(2);
        index.insert(chunk("x"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk("y"), vec![0.0, 3.0]).unwrap();
        index.insert(chunk("xy"), vec![1.0, 1.0]).unwrap();

        let results = index.search(&[0.0, 1.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source(), "y");
        assert_eq!(results[1].chunk.source(), "xy");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new(2);
        for source in ["first", "second", "third"] {
            index.insert(chunk(source), vec![2.0, 2.0]).unwrap();
        }

        let sources: Vec<String> = index
            .search(&[1.0, 1.0], 3)
            .into_iter()
            .map(|r| r.chunk.metadata.source)
            .collect();
        assert_eq!(sources, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_index_and_zero_k() {
        let index = VectorIndex::new(4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 8).is_empty());

        let mut index = VectorIndex::new(1);
        index.insert(chunk("a"), vec![1.0]).unwrap();
        assert!(index.search(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let mut index = VectorIndex::new(3);
        assert!(index.insert(chunk("a"), vec![1.0]).is_err());
        assert!(index.is_empty());
    }
}
