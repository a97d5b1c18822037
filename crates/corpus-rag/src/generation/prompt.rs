//! Prompt templates for RAG generation

use crate::types::SearchResult;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts in ranked order, separated by blank lines
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the grounding prompt sent as a single user message
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            "You are a helpful assistant. Read the context and answer the question. \
List all relevant facts you find. If the answer is not contained, reply that you don't know.\n\n\
Context:\n{context}\n\n\
Question: {question}\n\
Answer:",
            context = context,
            question = question,
        )
    }
}
