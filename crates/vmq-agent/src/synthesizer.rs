//! Answer synthesis for questions that are not backend operations.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vmq_protocol::Document;

use crate::llm::{ChatMessage, ChatModel, LlmError};

/// Separator placed between retrieved documents in the grounded prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the final prompt and asks the model for an answer.
pub struct AnswerSynthesizer {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Answer `question`, grounded on `context` when it is non-empty.
    ///
    /// Always returns text. Model failures come back as `"Error: ..."`.
    pub async fn synthesize(
        &self,
        question: &str,
        context: Option<&[Document]>,
        cancel: &CancellationToken,
    ) -> String {
        let prompt = match context {
            Some(docs) if !docs.is_empty() => grounded_prompt(question, docs),
            _ => question.to_string(),
        };
        let messages = [ChatMessage::user(prompt)];

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LlmError::Cancelled),
            r = tokio::time::timeout(self.timeout, self.model.chat(&messages)) => {
                r.unwrap_or(Err(LlmError::Timeout))
            }
        };

        match outcome {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, model = self.model.model_name(), "synthesis failed");
                render_error(&e)
            }
        }
    }
}

/// Prompt that pins the model to the retrieved context.
pub fn grounded_prompt(question: &str, docs: &[Document]) -> String {
    let context = docs
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "Answer the question using only the context below. \
If the context does not contain the answer, say that you don't have enough information to answer.\n\n\
Context:\n{context}\n\n\
Question: {question}\n\n\
Answer:"
    )
}

fn render_error(e: &LlmError) -> String {
    match e {
        LlmError::Timeout => "Error: Request timed out".into(),
        LlmError::Cancelled => "Error: Request cancelled".into(),
        other => format!("Error: {other}"),
    }
}
