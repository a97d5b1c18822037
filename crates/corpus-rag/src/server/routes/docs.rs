//! Loaded document previews

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;
use serde::Deserialize;

use super::query_params;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestedDocsResponse;

/// Default number of previews returned
pub const DEFAULT_LIMIT: usize = 50;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct DocsParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// GET /ingested_docs?limit=50
pub async fn ingested_docs(
    State(state): State<AppState>,
    params: std::result::Result<Query<DocsParams>, QueryRejection>,
) -> Result<Json<IngestedDocsResponse>> {
    let limit = query_params(params)?.limit;
    if limit < 1 {
        return Err(Error::validation("'limit' must be at least 1"));
    }

    Ok(Json(IngestedDocsResponse::from_documents(state.documents(), limit)))
}
