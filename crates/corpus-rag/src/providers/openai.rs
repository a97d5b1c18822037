//! OpenAI-compatible chat completions provider
//!
//! Works against any gateway exposing `POST {base_url}/chat/completions`
//! (hosted APIs, free proxies, llama.cpp or Ollama's `/v1` shim). The API key
//! is optional; no key means no `Authorization` header.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::llm::{ChatMessage, LlmProvider};
use super::retry::{retry_with_backoff, with_timeout};
use crate::config::LlmConfig;
use crate::error::{BackendError, Result};

const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat provider for OpenAI-compatible endpoints
pub struct OpenAiCompatibleLlm {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
}

impl OpenAiCompatibleLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            max_retries: config.max_retries,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn complete_once(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: usize,
    ) -> std::result::Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: max_output_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = self.authorize(self.client.post(&url)).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Provider(format!("HTTP {} - {}", status, text)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Malformed("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: usize,
    ) -> std::result::Result<String, BackendError> {
        tracing::info!("Generating answer with model: {}", self.model);

        with_timeout(
            self.timeout,
            retry_with_backoff(
                self.max_retries,
                RETRY_BASE_DELAY,
                BackendError::is_retryable,
                || self.complete_once(messages, max_output_tokens),
            ),
        )
        .await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self.authorize(self.client.get(&url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_max_tokens_budget() {
        let messages = vec![ChatMessage::user("hello")];
        let body = CompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            max_tokens: 256,
            temperature: 0.3,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_without_content_parses() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn test_empty_api_key_is_ignored() {
        let config = LlmConfig {
            api_key: Some(String::new()),
            ..LlmConfig::default()
        };
        let llm = OpenAiCompatibleLlm::new(&config).unwrap();
        assert!(llm.api_key.is_none());
    }
}
