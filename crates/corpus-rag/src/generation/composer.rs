//! Answer composition with the "I don't know." fallback policy

use std::sync::Arc;

use super::prompt::PromptBuilder;
use crate::error::BackendError;
use crate::providers::{ChatMessage, LlmProvider};
use crate::types::{GenerateResponse, RagResponse, SearchResult};

/// Sentinel answer for every path that cannot produce a grounded answer
pub const SORRY_ANSWER: &str = "I don't know.";

/// Builds the grounding prompt, calls the backend and applies the fallback policy
#[derive(Clone)]
pub struct AnswerComposer {
    llm: Arc<dyn LlmProvider>,
    max_output_tokens: usize,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmProvider>, max_output_tokens: usize) -> Self {
        Self {
            llm,
            max_output_tokens,
        }
    }

    /// Answer `question` from `retrieval`; never fails
    pub async fn answer(&self, question: &str, retrieval: &[SearchResult]) -> RagResponse {
        if retrieval.is_empty() {
            tracing::debug!("No context retrieved, skipping backend call");
            return sorry(question);
        }

        let context = PromptBuilder::build_context(retrieval);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        match self.call_backend(prompt).await {
            Ok(answer) if is_non_answer(&answer) => {
                tracing::debug!("Backend declined to answer");
                sorry(question)
            }
            Ok(answer) => RagResponse::answered(question, answer.trim(), retrieval),
            Err(e) => {
                log_backend_failure("rag", &e);
                sorry(question)
            }
        }
    }

    /// Pass `prompt` straight to the backend, no retrieval
    pub async fn generate(&self, prompt: &str) -> GenerateResponse {
        let completion = match self.call_backend(prompt.to_string()).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                log_backend_failure("generate", &e);
                SORRY_ANSWER.to_string()
            }
        };

        GenerateResponse {
            prompt: prompt.to_string(),
            completion,
        }
    }

    async fn call_backend(&self, prompt: String) -> Result<String, BackendError> {
        let messages = [ChatMessage::user(prompt)];
        self.llm.complete(&messages, self.max_output_tokens).await
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }
}

fn sorry(question: &str) -> RagResponse {
    RagResponse {
        question: question.to_string(),
        answer: SORRY_ANSWER.to_string(),
        sources: Vec::new(),
    }
}

/// Empty after trimming, or opening with "i don't know" in any case
fn is_non_answer(answer: &str) -> bool {
    let trimmed = answer.trim();
    trimmed.is_empty() || trimmed.to_lowercase().starts_with("i don't know")
}

fn log_backend_failure(endpoint: &str, error: &BackendError) {
    match error {
        BackendError::Timeout => tracing::error!("{}: backend timed out", endpoint),
        BackendError::Provider(msg) => tracing::error!("{}: backend provider error: {}", endpoint, msg),
        BackendError::Malformed(msg) => tracing::error!("{}: malformed backend response: {}", endpoint, msg),
        BackendError::EmptyResponse => tracing::error!("{}: backend returned nothing", endpoint),
    }
}
