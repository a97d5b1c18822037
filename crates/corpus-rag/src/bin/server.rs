//! RAG Server binary
//!
//! Run with: cargo run -p corpus-rag --bin corpus-rag-server -- --docs-dir ./documents

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpus_rag::{config::RagConfig, providers::create_llm, server::RagServer};

/// Retrieval-augmented answers over a local document corpus
#[derive(Debug, Parser)]
#[command(name = "corpus-rag-server", version, about)]
struct Args {
    /// TOML configuration file (also read from CORPUS_RAG_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Corpus root directory
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Persisted index directory
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Rebuild the index even if one is persisted
    #[arg(long)]
    rebuild_index: bool,
}

impl Args {
    fn apply(self, config: &mut RagConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(docs_dir) = self.docs_dir {
            config.corpus.docs_dir = docs_dir;
        }
        if let Some(index_path) = self.index_path {
            config.index.storage_path = index_path;
        }
        if self.rebuild_index {
            config.index.rebuild = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                     Corpus RAG Server                     ║
║          Grounded answers from your own documents         ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let mut config = RagConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Corpus: {}", config.corpus.docs_dir.display());
    tracing::info!("  - Index: {}", config.index.storage_path.display());
    tracing::info!(
        "  - Embeddings: {:?} {} ({} dims)",
        config.embeddings.provider,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM: {:?} {} at {}", config.llm.provider, config.llm.model, config.llm.base_url);
    tracing::info!(
        "  - Chunk size: {} (overlap {}), top k: {}, max tokens: {}",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.retrieval.top_k,
        config.llm.max_output_tokens
    );

    // Check the language-model backend
    tracing::info!("Checking LLM backend at {}...", config.llm.base_url);
    if create_llm(&config.llm)?.health_check().await {
        tracing::info!("LLM backend is reachable");
    } else {
        tracing::warn!("LLM backend not available at {}", config.llm.base_url);
        tracing::warn!("Answers will fall back to \"I don't know.\" until it is reachable");
    }

    // Create and start server
    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  GET /rag?question=...   - Ask questions");
    println!("  GET /generate?prompt=.. - Direct completion");
    println!("  GET /ingested_docs      - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
