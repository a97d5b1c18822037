//! Provider abstractions for embeddings and language-model backends
//!
//! Trait-based seams so the index and the answer composer never depend on a
//! concrete service. Local backends: Ollama, any OpenAI-compatible gateway,
//! and an offline hashing embedder.

pub mod embedding;
pub mod hashing;
pub mod llm;
pub mod ollama;
pub mod openai;
mod retry;

pub use embedding::{create_embedder, EmbeddingProvider};
pub use hashing::HashingEmbedder;
pub use llm::{create_llm, ChatMessage, ChatRole, LlmProvider};
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use openai::OpenAiCompatibleLlm;
