use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::operation::OperationResult;

/// What the engine hands back for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Unique query ID (UUIDv7 for time-sortability).
    pub query_id: Uuid,
    /// User-facing answer text.
    pub answer: String,
    /// True when the question was routed to the VM backend.
    pub is_api_operation: bool,
    /// Structured backend outcome (operation path only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_result: Option<OperationResult>,
    /// Documents the answer was grounded on (retrieval path only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<Document>>,
    /// End-to-end processing time in milliseconds.
    pub latency_ms: u64,
    pub answered_at: DateTime<Utc>,
}

impl QueryResponse {
    /// Response for a question handled by the VM backend.
    pub fn operation(answer: String, result: OperationResult, latency_ms: u64) -> Self {
        Self {
            query_id: Uuid::now_v7(),
            answer,
            is_api_operation: true,
            api_result: Some(result),
            context: None,
            latency_ms,
            answered_at: Utc::now(),
        }
    }

    /// Response for a question answered by the language model.
    pub fn answer(answer: String, context: Option<Vec<Document>>, latency_ms: u64) -> Self {
        Self {
            query_id: Uuid::now_v7(),
            answer,
            is_api_operation: false,
            api_result: None,
            context,
            latency_ms,
            answered_at: Utc::now(),
        }
    }
}
