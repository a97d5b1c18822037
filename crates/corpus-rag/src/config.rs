//! Configuration for the RAG service
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables. The server binary applies its CLI flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "CORPUS_RAG_CONFIG";

/// Main RAG service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Document corpus configuration
    pub corpus: CorpusConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Language-model backend configuration
    pub llm: LlmConfig,
    /// Persisted index configuration
    pub index: IndexConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file plus environment overrides.
    ///
    /// When `path` is `None`, the file named by `CORPUS_RAG_CONFIG` is used if set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_toml_file(&file)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; missing sections fall back to defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the process environment in production)
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "RAG_HOST", &mut self.server.host)?;
        override_from(&lookup, "RAG_PORT", &mut self.server.port)?;
        override_from(&lookup, "DOCS_DIR", &mut self.corpus.docs_dir)?;
        override_from(&lookup, "VECTOR_PATH", &mut self.index.storage_path)?;
        override_from(&lookup, "EMBED_PROVIDER", &mut self.embeddings.provider)?;
        override_from(&lookup, "EMBED_MODEL", &mut self.embeddings.model)?;
        override_from(&lookup, "EMBED_DIMENSIONS", &mut self.embeddings.dimensions)?;
        override_from(&lookup, "EMBED_BASE_URL", &mut self.embeddings.base_url)?;
        override_from(&lookup, "CHUNK_SIZE", &mut self.chunking.chunk_size)?;
        override_from(&lookup, "CHUNK_OVERLAP", &mut self.chunking.chunk_overlap)?;
        override_from(&lookup, "RAG_TOP_K", &mut self.retrieval.top_k)?;
        override_from(&lookup, "MAX_TOKENS", &mut self.llm.max_output_tokens)?;
        override_from(&lookup, "LLM_PROVIDER", &mut self.llm.provider)?;
        override_from(&lookup, "LLM_BASE_URL", &mut self.llm.base_url)?;
        override_from(&lookup, "LLM_MODEL", &mut self.llm.model)?;
        override_from(&lookup, "LLM_TIMEOUT_SECS", &mut self.llm.timeout_secs)?;
        if let Some(key) = lookup("LLM_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be at least 1".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(Error::Config("llm.max_output_tokens must be at least 1".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {} ({})", key, raw, e)))?;
    }
    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Document corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Root directory walked at startup
    pub docs_dir: PathBuf,
    /// Number of parallel file readers (default: CPU count)
    pub parallel_files: Option<usize>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("documents"),
            parallel_files: None,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embeddings API
    #[default]
    Ollama,
    /// Deterministic feature hashing, no external service
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" | "hash" => Ok(Self::Hashing),
            other => Err(format!("unknown embedding provider '{}'", other)),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedding backend to use
    pub provider: EmbeddingBackend,
    /// Model identifier (recorded in the persisted index)
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Base URL of the embedding service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Concurrent embedding requests while building the index
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            concurrency: 4,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between neighbouring chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

/// Language-model backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Ollama chat API
    #[default]
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(format!("unknown llm provider '{}'", other)),
        }
    }
}

/// Language-model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which backend to call
    pub provider: LlmBackend,
    /// Base URL (Ollama root, or OpenAI-compatible `.../v1` root)
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Optional bearer token for OpenAI-compatible backends
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Output length budget in tokens
    pub max_output_tokens: usize,
    /// Upper bound for a single backend call in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            temperature: 0.3,
            max_output_tokens: 256,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Persisted vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub storage_path: PathBuf,
    /// Ignore any persisted index and rebuild it at startup
    pub rebuild: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("vector_index"),
            rebuild: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.llm.max_output_tokens, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 400

            [llm]
            provider = "openai"
            base_url = "http://localhost:1337/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.llm.provider, LlmBackend::OpenAi);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VECTOR_PATH", "/tmp/idx"),
            ("EMBED_MODEL", "all-minilm"),
            ("MAX_TOKENS", "512"),
            ("EMBED_PROVIDER", "hashing"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.index.storage_path, PathBuf::from("/tmp/idx"));
        assert_eq!(config.embeddings.model, "all-minilm");
        assert_eq!(config.llm.max_output_tokens, 512);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hashing);
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let mut config = RagConfig::default();
        let result = config.apply_env_from(|key| {
            (key == "RAG_TOP_K").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 800;
        assert!(config.validate().is_err());
    }
}
