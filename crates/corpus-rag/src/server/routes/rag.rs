//! Retrieval-augmented question answering

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{query_params, require_non_empty};
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::RagResponse;

#[derive(Debug, Deserialize)]
pub struct RagParams {
    pub question: String,
}

/// GET /rag?question=...
///
/// Retrieval and backend failures degrade to the "I don't know." answer.
pub async fn rag(
    State(state): State<AppState>,
    params: std::result::Result<Query<RagParams>, QueryRejection>,
) -> Result<Json<RagResponse>> {
    let question = require_non_empty("question", query_params(params)?.question)?;
    tracing::info!("Query: \"{}\"", question);

    let retrieval = match state.retriever().retrieve(&question).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Retrieval failed: {}", e);
            Vec::new()
        }
    };

    Ok(Json(state.composer().answer(&question, &retrieval).await))
}
