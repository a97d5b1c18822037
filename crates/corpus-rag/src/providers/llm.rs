//! Language-model backend trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{OllamaLlm, OpenAiCompatibleLlm};
use crate::config::{LlmBackend, LlmConfig};
use crate::error::{BackendError, Result};

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
}

/// A single chat message sent to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Trait for chat-completion backends
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
/// - `OpenAiCompatibleLlm`: Any `/chat/completions` endpoint
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete the conversation with at most `max_output_tokens` tokens
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: usize,
    ) -> std::result::Result<String, BackendError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Build the configured language-model backend
pub fn create_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.provider {
        LlmBackend::Ollama => Arc::new(OllamaLlm::new(config)?),
        LlmBackend::OpenAi => Arc::new(OpenAiCompatibleLlm::new(config)?),
    };

    tracing::info!("LLM provider: {} (model: {})", llm.name(), llm.model());
    Ok(llm)
}
