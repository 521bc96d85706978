//! Question answering endpoint.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use vmq_protocol::QueryResponse;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for a question.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question or VM operation request.
    pub question: String,
    /// Documents to retrieve; the engine default when absent.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// POST /api/v1/query: route a question and return the engine's response.
pub async fn query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".into()));
    }

    let top_k = req.top_k.unwrap_or_else(|| state.engine.default_top_k());
    // A dropped connection drops this future, so no token is ever cancelled here.
    let response = state
        .engine
        .query_with(question, top_k, &CancellationToken::new())
        .await;

    tracing::info!(
        query_id = %response.query_id,
        is_api_operation = response.is_api_operation,
        latency_ms = response.latency_ms,
        "query answered"
    );
    Ok(Json(response))
}
