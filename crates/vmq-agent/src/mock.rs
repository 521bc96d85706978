//! In-memory stand-ins for the language model and the VM backend.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::backend::{BackendClient, BackendError, BackendResult, LaunchRequest};
use crate::llm::{ChatMessage, ChatModel, LlmError, LlmResult, Role};
use crate::router::SYSTEM_PROMPT;

/// A chat model with canned replies.
///
/// Requests carrying the classification system prompt get
/// `classification`; everything else gets `answer`.
pub struct ScriptedModel {
    classification: String,
    answer: String,
    offline: bool,
    delay: Duration,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(classification: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            answer: answer.into(),
            offline: false,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Classifies everything as "not an operation" and answers with `answer`.
    pub fn answering(answer: impl Into<String>) -> Self {
        Self::new(r#"{"operation": null}"#, answer)
    }

    /// Every call fails with a transport error.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new("", "")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every message list sent so far, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.offline {
            return Err(LlmError::Transport("connection refused".into()));
        }

        let is_classification = messages
            .first()
            .is_some_and(|m| m.role == Role::System && m.content == SYSTEM_PROMPT);
        Ok(if is_classification {
            self.classification.clone()
        } else {
            self.answer.clone()
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A VM backend that keeps its VM set in memory and counts calls.
pub struct MockBackend {
    vms: Mutex<Vec<serde_json::Value>>,
    wrap_list: bool,
    unreachable: bool,
    launches: AtomicUsize,
    lists: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            vms: Mutex::new(Vec::new()),
            wrap_list: false,
            unreachable: false,
            launches: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Pre-load VM records (raw JSON, as the backend would report them).
    pub fn with_vms(vms: Vec<serde_json::Value>) -> Self {
        let backend = Self::new();
        if let Ok(mut guard) = backend.vms.lock() {
            *guard = vms;
        }
        backend
    }

    /// Answer `/list-vms` with `{"vms": [...]}` instead of a bare array.
    pub fn wrapped(mut self) -> Self {
        self.wrap_list = true;
        self
    }

    /// Every call fails as if the backend were down.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    pub fn launch_calls(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Current VM set.
    pub fn vms(&self) -> Vec<serde_json::Value> {
        self.vms.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> BackendResult<()> {
        if self.unreachable {
            return Err(BackendError::Connection {
                url: self.base_url().to_string(),
                detail: "connection refused".into(),
            });
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn launch_vm(&self, request: &LaunchRequest) -> BackendResult<serde_json::Value> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        self.check_reachable()?;

        let id = format!("vm-{n:04}");
        let ssh_port = 50000 + n;
        let pid = 4000 + n;
        if let Ok(mut vms) = self.vms.lock() {
            vms.push(json!({
                "id": id,
                "name": request.name,
                "instance_type": request.instance_type,
                "region": request.region,
                "ssh_port": ssh_port,
                "pid": pid,
            }));
        }
        Ok(json!({
            "instance_id": id,
            "ssh_port": ssh_port,
            "pid": pid,
            "message": format!("VM '{}' launched", request.name),
        }))
    }

    async fn list_vms(&self) -> BackendResult<serde_json::Value> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let vms = serde_json::Value::Array(self.vms());
        Ok(if self.wrap_list {
            json!({ "vms": vms })
        } else {
            vms
        })
    }

    async fn delete_vm(&self, id: &str) -> BackendResult<String> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut vms = self
            .vms
            .lock()
            .map_err(|_| BackendError::Unexpected("mock state poisoned".into()))?;
        let before = vms.len();
        vms.retain(|vm| vm.get("id").and_then(|v| v.as_str()) != Some(id));
        if vms.len() == before {
            return Err(BackendError::Http {
                status: 404,
                body: "VM not found".into(),
            });
        }
        Ok(format!("VM {id} deleted successfully"))
    }

    fn base_url(&self) -> &str {
        "http://mock-backend"
    }
}
