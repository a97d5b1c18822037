//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source label of the synthetic document used when the corpus is missing
pub const FALLBACK_SOURCE: &str = "fallback";

/// Source label used when a chunk or document has no known origin
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Text of the synthetic fallback document
pub const FALLBACK_CONTENT: &str =
    "This is a fallback document. Add PDFs or TXT files to the documents directory to improve answers.";

/// How a file is turned into text, resolved once from its extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    /// UTF-8 text (txt, md, rst, log, csv), decoded lossily
    Text,
    /// Page-oriented binary document (pdf), text extracted per page
    PageDocument,
    /// Not ingested
    Skip,
}

impl LoaderKind {
    /// Classify by file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "md" | "rst" | "log" | "csv" => Self::Text,
            "pdf" => Self::PageDocument,
            _ => Self::Skip,
        }
    }

    /// Classify a path; files without an extension are skipped
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Skip)
    }

    /// Whether files of this kind are ingested
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Metadata attached to documents and inherited by their chunks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Citation label: path relative to the corpus root, or `fallback`/`unknown`
    pub source: String,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        if source.is_empty() {
            Self {
                source: UNKNOWN_SOURCE.to_string(),
            }
        } else {
            Self { source }
        }
    }
}

/// A loaded document, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Extracted text
    pub content: String,
    /// Source metadata
    pub metadata: DocumentMetadata,
}

impl RawDocument {
    /// Create a new document
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata::new(source),
        }
    }

    /// The deterministic document served when the corpus directory is absent
    pub fn fallback() -> Self {
        Self::new(FALLBACK_CONTENT, FALLBACK_SOURCE)
    }

    /// Citation label
    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A bounded text window of one document; the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,
    /// Metadata inherited from the parent document
    pub metadata: DocumentMetadata,
    /// Position of this chunk within its document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata, chunk_index: u32) -> Self {
        Self {
            content: content.into(),
            metadata,
            chunk_index,
        }
    }

    /// Citation label
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}
