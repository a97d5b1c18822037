//! Ollama-based providers for embeddings and chat completion

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, LlmProvider};
use super::retry::{retry_with_backoff, with_timeout};
use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{BackendError, Error, Result};

const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
    concurrency: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.concurrency.max(1))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
            concurrency: config.concurrency.max(1),
        })
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if embed_response.embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embed_response.embedding.len(),
                self.dimensions
            )));
        }

        Ok(embed_response.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry_with_backoff(
            self.max_retries,
            RETRY_BASE_DELAY,
            |e: &Error| matches!(e, Error::Embedding(_)),
            || self.embed_once(text),
        )
        .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama has no batch endpoint; keep a bounded number of requests in flight
        stream::iter(texts.iter().cloned())
            .map(|text| async move { self.embed(&text).await })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama chat provider for answer generation
pub struct OllamaLlm {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            max_retries: config.max_retries,
        })
    }

    async fn chat_once(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: usize,
    ) -> std::result::Result<String, BackendError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: max_output_tokens,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Provider(format!("HTTP {} - {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        let content = chat_response.message.content.trim().to_string();
        if content.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
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
                || self.chat_once(messages, max_output_tokens),
            ),
        )
        .await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Local stand-in for `/api/embeddings`: `[len, 1.0]`, shorter prompts answer later
    async fn spawn_embedding_server() -> String {
        async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
            let prompt = body["prompt"].as_str().unwrap_or_default();
            let len = prompt.chars().count() as u64;
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(len * 5))).await;
            Json(json!({ "embedding": [len as f32, 1.0] }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/api/embeddings", post(embeddings));
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    fn config(base_url: String, dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url,
            dimensions,
            max_retries: 0,
            concurrency: 4,
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed_batch_keeps_input_order() {
        let embedder = OllamaEmbedder::new(&config(spawn_embedding_server().await, 2)).unwrap();
        let texts: Vec<String> = ["a", "bbbbbb", "cc", "dddd", "eee"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        let lengths: Vec<f32> = embeddings.iter().map(|e| e[0]).collect();

        assert_eq!(lengths, vec![1.0, 6.0, 2.0, 4.0, 3.0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_embedding_error() {
        let embedder = OllamaEmbedder::new(&config(spawn_embedding_server().await, 3)).unwrap();
        let result = embedder.embed("hello").await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
