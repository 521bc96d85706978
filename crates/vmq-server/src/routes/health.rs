//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health: liveness plus corpus status.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let retriever = state.engine.retriever();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": retriever.corpus_len().await,
        "index_built": retriever.is_built().await,
    }))
}
