//! Ollama embedding client (`POST /api/embed`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::{RetrievalError, RetrievalResult};

/// Configuration for the Ollama embedding endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaEmbedderConfig {
    /// Ollama HTTP API base URL.
    #[serde(default = "default_host")]
    pub host: String,
    /// Embedding model to use.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "nomic-embed-text".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for OllamaEmbedderConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeds text through a local Ollama runtime.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    config: OllamaEmbedderConfig,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbedderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.config.host.trim_end_matches('/'));
        let body = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!(
                "ollama returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("invalid embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        tracing::debug!(
            model = %self.config.model,
            count = texts.len(),
            "ollama embeddings computed"
        );
        Ok(parsed.embeddings)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
