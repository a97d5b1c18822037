//! Recursive character text splitting with overlap

use std::collections::VecDeque;

use crate::types::{Chunk, RawDocument};

/// Separators tried in order: paragraph, line, word, character
const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Text chunker with configurable size and overlap, both in characters
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap carried from the tail of the previous chunk
    overlap: usize,
    separators: Vec<&'static str>,
}

impl TextChunker {
    /// Create a new chunker; `overlap` is clamped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    /// Chunk every document, preserving document order
    pub fn chunk_documents(&self, docs: &[RawDocument]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs.iter().flat_map(|doc| self.chunk_document(doc)).collect();
        tracing::debug!("Split {} documents into {} chunks", docs.len(), chunks.len());
        chunks
    }

    /// Chunk a single document
    pub fn chunk_document(&self, doc: &RawDocument) -> Vec<Chunk> {
        self.split_text(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk::new(content, doc.metadata.clone(), i as u32))
            .collect()
    }

    /// Split text into windows of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        // First separator present in the text; "" always matches
        let (separator, remaining) = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .map(|i| (separators[i], &separators[i + 1..]))
            .unwrap_or(("", &[]));

        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for split in splits {
            if char_len(split) < self.chunk_size {
                fitting.push(split);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_splits(&fitting, separator));
                fitting.clear();
            }

            if remaining.is_empty() {
                chunks.push(split.trim().to_string());
            } else {
                chunks.extend(self.split_recursive(split, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_splits(&fitting, separator));
        }

        chunks.retain(|c| !c.is_empty());
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, carrying `overlap` characters forward
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &split in splits {
            let len = char_len(split);
            let joined_len = |total: usize, current: &VecDeque<&str>| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(total, &current) > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);

                // Drop leading pieces until only the overlap remains and the next piece fits
                while total > self.overlap
                    || (total > 0 && joined_len(total, &current) > self.chunk_size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(split);
        }

        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, separator: &str) {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
