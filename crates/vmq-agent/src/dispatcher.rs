//! Operation dispatcher: executes a classified descriptor against the VM backend.
//!
//! Every outcome, including backend failures, comes back as an
//! `OperationResult`; nothing here returns an error to the caller.

use std::sync::Arc;

use thiserror::Error;
use vmq_protocol::{
    DEFAULT_INSTANCE_TYPE, DEFAULT_REGION, DEFAULT_VM_NAME, Operation, OperationDescriptor,
    OperationResult, find_vm_id_by_name, normalize_vm_list,
};

use crate::backend::{BackendClient, BackendError, LaunchRequest};

/// Dispatch failures surfaced in `OperationResult::error`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Delete by name found no VM with that name.
    #[error("VM with name '{0}' not found")]
    NameNotFound(String),

    #[error("VM ID or name is required")]
    MissingTarget,

    #[error("Unknown operation: {0}")]
    Unsupported(String),
}

/// Runs operations against a `BackendClient`.
pub struct OperationDispatcher {
    backend: Arc<dyn BackendClient>,
}

impl OperationDispatcher {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    pub fn backend_url(&self) -> &str {
        self.backend.base_url()
    }

    /// Execute one descriptor.
    ///
    /// One backend round trip, except delete-by-name which lists first.
    /// No retries.
    pub async fn dispatch(&self, descriptor: &OperationDescriptor) -> OperationResult {
        let op_name = descriptor.operation.as_str().to_string();

        let outcome = match &descriptor.operation {
            Operation::Launch => self.launch(descriptor).await,
            Operation::List => self.list().await,
            Operation::Delete => self.delete(descriptor).await,
            Operation::None | Operation::Unknown(_) => {
                Err(DispatchError::Unsupported(op_name.clone()))
            }
        };

        match outcome {
            Ok(data) => {
                tracing::info!(operation = %op_name, "operation succeeded");
                OperationResult::ok(op_name, data)
            }
            Err(e) => {
                tracing::warn!(operation = %op_name, error = %e, "operation failed");
                OperationResult::failed(op_name, e.to_string())
            }
        }
    }

    async fn launch(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<serde_json::Value, DispatchError> {
        let request = LaunchRequest {
            name: descriptor.param("name").unwrap_or(DEFAULT_VM_NAME).to_string(),
            instance_type: descriptor
                .param("instance_type")
                .unwrap_or(DEFAULT_INSTANCE_TYPE)
                .to_string(),
            region: descriptor.param("region").unwrap_or(DEFAULT_REGION).to_string(),
        };
        tracing::debug!(
            name = %request.name,
            instance_type = %request.instance_type,
            region = %request.region,
            "launching VM"
        );
        Ok(self.backend.launch_vm(&request).await?)
    }

    async fn list(&self) -> Result<serde_json::Value, DispatchError> {
        let body = self.backend.list_vms().await?;
        Ok(normalize_vm_list(body))
    }

    async fn delete(
        &self,
        descriptor: &OperationDescriptor,
    ) -> Result<serde_json::Value, DispatchError> {
        let id = match (descriptor.param("id"), descriptor.param("name")) {
            (Some(id), _) => id.to_string(),
            (None, Some(name)) => self.resolve_name(name).await?,
            (None, None) => return Err(DispatchError::MissingTarget),
        };

        let message = self.backend.delete_vm(&id).await?;
        Ok(serde_json::json!({ "message": message }))
    }

    /// Name → id via one `/list-vms` call. Racy against concurrent
    /// backend changes; the delete may then 404.
    async fn resolve_name(&self, name: &str) -> Result<String, DispatchError> {
        let listing = normalize_vm_list(self.backend.list_vms().await?);
        let id = find_vm_id_by_name(&listing, name)
            .ok_or_else(|| DispatchError::NameNotFound(name.to_string()))?;
        tracing::debug!(name, id = %id, "resolved VM name");
        Ok(id)
    }
}
