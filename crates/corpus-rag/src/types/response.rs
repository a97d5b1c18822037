//! Response types for the HTTP surface and retrieval results

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::document::{Chunk, RawDocument};

/// Number of characters shown in a document preview
pub const PREVIEW_CHARS: usize = 160;

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (higher is more similar)
    pub score: f32,
}

/// Response of `GET /rag`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub question: String,
    pub answer: String,
    /// Deduplicated source labels of the contributing chunks
    pub sources: Vec<String>,
}

impl RagResponse {
    /// Answer with the unique sources of `results`
    pub fn answered(question: impl Into<String>, answer: impl Into<String>, results: &[SearchResult]) -> Self {
        let mut seen = HashSet::new();
        let sources = results
            .iter()
            .map(|r| r.chunk.source().to_string())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        Self {
            question: question.into(),
            answer: answer.into(),
            sources,
        }
    }
}

/// Response of `GET /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub prompt: String,
    pub completion: String,
}

/// One entry of `GET /ingested_docs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocPreview {
    /// Position in the loaded document list
    pub id: usize,
    pub source: String,
    /// Content length in characters
    pub chars: usize,
    /// First characters of the content, newlines flattened
    pub preview: String,
}

impl DocPreview {
    pub fn new(id: usize, doc: &RawDocument) -> Self {
        Self {
            id,
            source: doc.source().to_string(),
            chars: doc.char_count(),
            preview: preview_text(&doc.content, PREVIEW_CHARS),
        }
    }
}

/// Response of `GET /ingested_docs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedDocsResponse {
    pub total: usize,
    pub shown: usize,
    pub docs: Vec<DocPreview>,
}

impl IngestedDocsResponse {
    /// Preview the first `limit` documents
    pub fn from_documents(documents: &[RawDocument], limit: usize) -> Self {
        let docs: Vec<DocPreview> = documents
            .iter()
            .take(limit)
            .enumerate()
            .map(|(id, doc)| DocPreview::new(id, doc))
            .collect();

        Self {
            total: documents.len(),
            shown: docs.len(),
            docs,
        }
    }
}

/// First `max_chars` characters with newlines replaced by spaces, `…` appended when cut
pub fn preview_text(content: &str, max_chars: usize) -> String {
    let mut preview: String = content
        .chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();

    if content.chars().nth(max_chars).is_some() {
        preview.push('…');
    }
    preview
}
