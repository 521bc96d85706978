//! Ollama chat client used for both intent classification and answer synthesis.
//!
//! Calls the local Ollama HTTP API (`/api/chat`) with a role-tagged message
//! list and returns the single non-streamed completion. The `ChatModel`
//! trait is the seam tests use to substitute a scripted model.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language-model call failures.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single-shot chat completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the messages and return the completion text.
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String>;

    /// Model identifier (for logging).
    fn model_name(&self) -> &str;
}

/// Configuration for the local Ollama endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    /// Ollama HTTP API base URL.
    #[serde(default = "default_host")]
    pub host: String,
    /// Model used for classification and synthesis.
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound for the classification call, in seconds.
    #[serde(default = "default_classify_timeout_secs")]
    pub classify_timeout_secs: u64,
    /// Upper bound for the synthesis call, in seconds.
    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama2".into()
}
fn default_classify_timeout_secs() -> u64 {
    60
}
fn default_synthesis_timeout_secs() -> u64 {
    60
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            classify_timeout_secs: default_classify_timeout_secs(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}

/// Ollama chat API request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Ollama chat API response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for the local Ollama chat endpoint.
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        let timeout = config.classify_timeout().max(config.synthesis_timeout());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Ask Ollama whether the configured model has been pulled.
    ///
    /// Accepts `llama2` matching `llama2:latest`.
    pub async fn has_model(&self) -> LlmResult<bool> {
        let url = format!("{}/api/tags", self.host());
        let response = self.client.get(&url).send().await.map_err(map_reqwest)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let wanted = self.config.model.as_str();
        Ok(tags.models.iter().any(|m| {
            m.name == wanted || m.name.split(':').next() == Some(wanted)
        }))
    }

    fn host(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        let url = format!("{}/api/chat", self.host());
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, "ollama returned non-200");
            return Err(LlmError::Status { status, body });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Decode(e.to_string())
            }
        })?;

        chat.message
            .map(|m| m.content)
            .ok_or_else(|| LlmError::Decode("response has no message".into()))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn map_reqwest(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e.to_string())
    }
}
