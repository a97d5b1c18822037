//! corpus-rag: retrieval-augmented answers over a local document corpus
//!
//! Files under a directory are loaded, chunked and embedded into a persisted
//! vector index at startup. Questions retrieve the closest chunks, which are
//! handed to a language-model backend as grounding context. Every failure on
//! the request path degrades to the "I don't know." answer.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{BackendError, Error, Result};
pub use generation::{AnswerComposer, SORRY_ANSWER};
pub use index::EmbeddingIndex;
pub use retrieval::Retriever;
pub use server::{build_router, state::AppState, RagServer};
pub use types::{Chunk, RagResponse, RawDocument, SearchResult};
