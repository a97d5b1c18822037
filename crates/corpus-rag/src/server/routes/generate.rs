//! Direct backend passthrough

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{query_params, require_non_empty};
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::GenerateResponse;

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub prompt: String,
}

/// GET /generate?prompt=...
pub async fn generate(
    State(state): State<AppState>,
    params: std::result::Result<Query<GenerateParams>, QueryRejection>,
) -> Result<Json<GenerateResponse>> {
    let prompt = require_non_empty("prompt", query_params(params)?.prompt)?;
    tracing::info!("Generate: {} chars", prompt.chars().count());

    Ok(Json(state.composer().generate(&prompt).await))
}
