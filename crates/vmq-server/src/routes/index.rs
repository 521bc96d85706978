//! Corpus maintenance endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/index/rebuild: reload the corpus and re-embed it.
pub async fn rebuild_index(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let documents = state.engine.reload_corpus().await?;
    tracing::info!(documents, "index rebuilt on request");
    Ok(Json(json!({ "documents": documents })))
}
