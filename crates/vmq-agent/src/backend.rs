//! VM management backend client.
//!
//! Wire contract:
//! - `POST /launch-vm` `{name, instance_type, region}` → JSON payload
//! - `GET /list-vms` → bare array or `{"vms": [...]}`
//! - `DELETE /delete-vm` `{id}` → plain-text confirmation

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorized backend failures. The display strings are what users see
/// in a failed `OperationResult`.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered with a non-2xx status.
    #[error("API error: {status} - {body}")]
    Http { status: u16, body: String },

    /// Backend unreachable (refused, DNS, timeout).
    #[error("Connection error: {detail}. Is the backend running at {url}?")]
    Connection { url: String, detail: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Body of `POST /launch-vm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub name: String,
    pub instance_type: String,
    pub region: String,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    id: &'a str,
}

/// The three backend calls the dispatcher needs.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn launch_vm(&self, request: &LaunchRequest) -> BackendResult<serde_json::Value>;

    /// Raw `/list-vms` body, not yet normalized.
    async fn list_vms(&self) -> BackendResult<serde_json::Value>;

    /// Returns the backend's confirmation text.
    async fn delete_vm(&self, id: &str) -> BackendResult<String>;

    fn base_url(&self) -> &str;
}

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL (overridden by `BACKEND_API_URL`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8081".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `BackendClient` over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn connection_error(&self, e: reqwest::Error) -> BackendError {
        BackendError::Connection {
            url: self.base_url.clone(),
            detail: e.to_string(),
        }
    }

    /// Turn a non-2xx response into `BackendError::Http`.
    async fn check_status(&self, response: reqwest::Response) -> BackendResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json(&self, response: reqwest::Response) -> BackendResult<serde_json::Value> {
        let text = response.text().await.map_err(|e| self.body_error(e))?;
        serde_json::from_str(&text)
            .map_err(|e| BackendError::Unexpected(format!("invalid JSON from backend: {e}")))
    }

    fn body_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            self.connection_error(e)
        } else {
            BackendError::Unexpected(e.to_string())
        }
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn launch_vm(&self, request: &LaunchRequest) -> BackendResult<serde_json::Value> {
        let response = self
            .client
            .post(self.url("/launch-vm"))
            .json(request)
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;
        let response = self.check_status(response).await?;
        self.read_json(response).await
    }

    async fn list_vms(&self) -> BackendResult<serde_json::Value> {
        let response = self
            .client
            .get(self.url("/list-vms"))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;
        let response = self.check_status(response).await?;
        self.read_json(response).await
    }

    async fn delete_vm(&self, id: &str) -> BackendResult<String> {
        let response = self
            .client
            .delete(self.url("/delete-vm"))
            .json(&DeleteRequest { id })
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;
        let response = self.check_status(response).await?;
        response.text().await.map_err(|e| self.body_error(e))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
