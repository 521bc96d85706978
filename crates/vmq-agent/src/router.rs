//! Intent router: turns a free-text question into an `OperationDescriptor`.
//!
//! The model's reply is untrusted input: it is sliced, parsed, and validated
//! in separate steps, and every failure collapses to `Operation::None` so the
//! question falls through to the retrieval path.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vmq_protocol::{Operation, OperationDescriptor};

use crate::llm::{ChatMessage, ChatModel};

/// Classification prompt. Lists the three backend operations and pins the
/// output to a single JSON object.
pub const SYSTEM_PROMPT: &str = r#"You classify requests sent to a virtual machine management system. Decide whether the user's message asks to perform one of these operations:

1. launch-vm: Create and start a new VM.
   Parameters: name (required), instance_type (optional, default "t2.micro"), region (optional, default "us-east-1")

2. list-vms: List all VMs.
   Parameters: none

3. delete-vm: Delete a VM.
   Parameters: id (the VM instance ID) or name (the VM name, used to look up its ID)

Respond with ONLY a JSON object (no markdown, no explanation):
{"operation": "launch-vm" | "list-vms" | "delete-vm", "params": {"name": "...", "instance_type": "...", "region": "...", "id": "..."}}

If the message is not one of these operations, respond with:
{"operation": null}

Only include parameters the user actually gave; defaults are filled in for you.

Examples:
- "create a VM called test-vm" -> {"operation": "launch-vm", "params": {"name": "test-vm"}}
- "spin up a t2.small named api in eu-west-1" -> {"operation": "launch-vm", "params": {"name": "api", "instance_type": "t2.small", "region": "eu-west-1"}}
- "list all VMs" -> {"operation": "list-vms", "params": {}}
- "delete the VM with id abc123" -> {"operation": "delete-vm", "params": {"id": "abc123"}}
- "remove the VM called staging" -> {"operation": "delete-vm", "params": {"name": "staging"}}
- "what is a VM?" -> {"operation": null}"#;

/// Classifies questions with the language model.
pub struct IntentRouter {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
}

impl IntentRouter {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Classify a question. Never fails: model errors, timeouts,
    /// cancellation, and unparseable replies all yield `Operation::None`.
    pub async fn classify(&self, question: &str, cancel: &CancellationToken) -> OperationDescriptor {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(question)];

        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("classification cancelled");
                return OperationDescriptor::none();
            }
            r = tokio::time::timeout(self.timeout, self.model.chat(&messages)) => r,
        };

        let raw = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "classification request failed");
                return OperationDescriptor::none();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "classification timed out"
                );
                return OperationDescriptor::none();
            }
        };

        let descriptor = parse_descriptor(&raw);
        tracing::debug!(
            operation = %descriptor.operation,
            model = self.model.model_name(),
            "question classified"
        );
        descriptor
    }
}

/// Slice from the first `{` to the last `}` inclusive.
///
/// Not brace-balance aware: a reply with two separate objects (or braces
/// in trailing prose) yields a span that won't parse, which then reads as
/// "not an operation".
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse and validate a raw model reply into a descriptor.
pub fn parse_descriptor(raw: &str) -> OperationDescriptor {
    let Some(span) = extract_json_span(raw) else {
        tracing::debug!("classifier reply has no JSON object");
        return OperationDescriptor::none();
    };

    let value: serde_json::Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "could not parse classifier reply");
            return OperationDescriptor::none();
        }
    };

    let Some(object) = value.as_object() else {
        return OperationDescriptor::none();
    };

    let operation = match object.get("operation").and_then(|v| v.as_str()) {
        Some(name) => Operation::from_wire(name),
        None => return OperationDescriptor::none(),
    };

    if let Operation::Unknown(name) = &operation {
        tracing::warn!(operation = %name, "classifier returned unknown operation");
        return OperationDescriptor::none();
    }

    let params = object
        .get("params")
        .and_then(|v| v.as_object())
        .map(normalize_params)
        .unwrap_or_default();

    OperationDescriptor::new(operation, params)
}

/// Keep scalar params as strings; drop nulls, empties, and nested values.
fn normalize_params(raw: &serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, String> {
    raw.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            (!value.is_empty()).then(|| (key.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedModel;

    fn router(model: ScriptedModel) -> IntentRouter {
        IntentRouter::new(Arc::new(model), Duration::from_secs(5))
    }

    // ── parse pipeline ───────────────────────────────────────────

    #[test]
    fn list_with_empty_params() {
        let d = parse_descriptor(r#"{"operation": "list-vms", "params": {}}"#);
        assert_eq!(d.operation, Operation::List);
    }

    #[test]
    fn launch_with_name_only_gets_defaults() {
        let d = parse_descriptor(r#"{"operation": "launch-vm", "params": {"name": "web"}}"#);
        assert_eq!(d.operation, Operation::Launch);
        assert_eq!(d.param("name"), Some("web"));
        assert_eq!(d.param("instance_type"), Some("t2.micro"));
        assert_eq!(d.param("region"), Some("us-east-1"));
    }

    #[test]
    fn prose_around_json_is_ignored() {
        let raw = "Sure! Here is the classification:\n{\"operation\": \"delete-vm\", \"params\": {\"id\": \"abc123\"}}\nLet me know if you need anything else.";
        let d = parse_descriptor(raw);
        assert_eq!(d.operation, Operation::Delete);
        assert_eq!(d.param("id"), Some("abc123"));
    }

    #[test]
    fn nested_braces_inside_one_object_parse() {
        let d = parse_descriptor(r#"{"operation": "list-vms", "params": {"filter": {"x": 1}}}"#);
        assert_eq!(d.operation, Operation::List);
        assert!(d.param("filter").is_none());
    }

    #[test]
    fn prose_without_braces_is_none() {
        let d = parse_descriptor("A VM is a virtual machine, an emulated computer.");
        assert_eq!(d, OperationDescriptor::none());
    }

    #[test]
    fn empty_and_whitespace_replies_are_none() {
        assert!(!parse_descriptor("").is_operation());
        assert!(!parse_descriptor("   \n\t").is_operation());
    }

    #[test]
    fn null_operation_is_none() {
        assert!(!parse_descriptor(r#"{"operation": null}"#).is_operation());
        assert!(!parse_descriptor(r#"{"params": {"name": "x"}}"#).is_operation());
    }

    #[test]
    fn two_json_spans_do_not_parse() {
        // first `{` to last `}` covers both objects plus the text between them
        let raw = r#"{"operation": "list-vms"} or maybe {"operation": "launch-vm"}"#;
        assert!(!parse_descriptor(raw).is_operation());
    }

    #[test]
    fn reversed_braces_are_none() {
        assert!(extract_json_span("} nothing here {").is_none());
    }

    #[test]
    fn unknown_operation_is_none() {
        let d = parse_descriptor(r#"{"operation": "reboot-vm", "params": {"id": "x"}}"#);
        assert!(!d.is_operation());
    }

    #[test]
    fn non_string_operation_is_none() {
        assert!(!parse_descriptor(r#"{"operation": ["list-vms"]}"#).is_operation());
    }

    #[test]
    fn scalar_params_are_stringified() {
        let d = parse_descriptor(
            r#"{"operation": "delete-vm", "params": {"id": 42, "name": null, "force": true, "region": ""}}"#,
        );
        assert_eq!(d.param("id"), Some("42"));
        assert_eq!(d.param("force"), Some("true"));
        assert!(d.param("name").is_none());
        // empty region is dropped, then defaulted
        assert_eq!(d.param("region"), Some("us-east-1"));
    }

    #[test]
    fn delete_name_and_id_ambiguity_is_preserved() {
        let d = parse_descriptor(r#"{"operation": "delete-vm", "params": {"name": "staging"}}"#);
        assert_eq!(d.operation, Operation::Delete);
        assert_eq!(d.param("name"), Some("staging"));
        assert!(d.param("id").is_none());
    }

    // ── classify (model round trip) ──────────────────────────────

    #[tokio::test]
    async fn classify_sends_system_prompt_and_question() {
        let model = Arc::new(ScriptedModel::new(r#"{"operation": "list-vms", "params": {}}"#, ""));
        let r = IntentRouter::new(model.clone(), Duration::from_secs(5));
        let d = r.classify("list all VMs", &CancellationToken::new()).await;
        assert_eq!(d.operation, Operation::List);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].content, SYSTEM_PROMPT);
        assert_eq!(calls[0][1].content, "list all VMs");
    }

    #[tokio::test]
    async fn classify_model_error_is_none() {
        let d = router(ScriptedModel::offline())
            .classify("list VMs", &CancellationToken::new())
            .await;
        assert!(!d.is_operation());
    }

    #[tokio::test]
    async fn classify_timeout_is_none() {
        let model = ScriptedModel::new(r#"{"operation": "list-vms"}"#, "")
            .with_delay(Duration::from_secs(5));
        let r = IntentRouter::new(Arc::new(model), Duration::from_millis(50));
        let d = r.classify("list VMs", &CancellationToken::new()).await;
        assert!(!d.is_operation());
    }

    #[tokio::test]
    async fn classify_cancelled_is_none() {
        let model = ScriptedModel::new(r#"{"operation": "list-vms"}"#, "")
            .with_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let d = router(model).classify("list VMs", &cancel).await;
        assert!(!d.is_operation());
    }
}
