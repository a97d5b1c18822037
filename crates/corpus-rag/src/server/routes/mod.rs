//! Route handlers for the RAG server

pub mod docs;
pub mod generate;
pub mod rag;

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Unwrap query parameters, turning extractor rejections into validation errors
pub(crate) fn query_params<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

/// Reject an empty required string parameter
pub(crate) fn require_non_empty(name: &str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(Error::validation(format!("'{}' must not be empty", name)));
    }
    Ok(value)
}

/// GET /api/info - service description and index statistics
pub async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    let index = state.index();

    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented answers over a local document corpus",
        "endpoints": {
            "GET /generate?prompt=": "Direct completion, no retrieval",
            "GET /rag?question=": "Grounded answer with sources",
            "GET /ingested_docs?limit=": "Preview of loaded documents",
            "GET /health": "Liveness check",
            "GET /api/info": "This document"
        },
        "models": {
            "embedding": index.model_id(),
            "dimensions": index.dimensions(),
            "llm": state.composer().llm().model(),
            "llm_provider": state.composer().llm().name()
        },
        "counts": {
            "documents": state.documents().len(),
            "chunks": index.len(),
            "top_k": config.retrieval.top_k
        }
    }))
}
