//! Core types for the RAG service

pub mod document;
pub mod response;

pub use document::{Chunk, DocumentMetadata, LoaderKind, RawDocument};
pub use response::{
    DocPreview, GenerateResponse, IngestedDocsResponse, RagResponse, SearchResult,
};
