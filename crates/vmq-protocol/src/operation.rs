use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default instance type applied when the model leaves it out.
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
/// Default region applied when the model leaves it out.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Name used for a launch request that carries no name.
pub const DEFAULT_VM_NAME: &str = "unnamed-vm";

/// Optional parameters and the value each one defaults to.
pub const PARAM_DEFAULTS: &[(&str, &str)] = &[
    ("instance_type", DEFAULT_INSTANCE_TYPE),
    ("region", DEFAULT_REGION),
];

/// Backend operation a question was classified as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Create and boot a new VM.
    Launch,
    /// List all VMs known to the backend.
    List,
    /// Delete a VM by id (or by name, resolved to an id first).
    Delete,
    /// Not an operation; answer from the document corpus.
    #[default]
    None,
    /// The model named something outside the grammar.
    Unknown(String),
}

impl Operation {
    /// Parse a model-supplied operation name. Accepts both the hyphenated
    /// endpoint names and the bare verbs.
    pub fn from_wire(name: &str) -> Self {
        match name.trim() {
            "launch-vm" | "launch" => Self::Launch,
            "list-vms" | "list" => Self::List,
            "delete-vm" | "delete" => Self::Delete,
            "" | "none" | "null" => Self::None,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Launch => "launch-vm",
            Self::List => "list-vms",
            Self::Delete => "delete-vm",
            Self::None => "none",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Operation {
    fn from(value: String) -> Self {
        Self::from_wire(&value)
    }
}

impl From<Operation> for String {
    fn from(value: Operation) -> Self {
        value.as_str().to_string()
    }
}

/// A classified intent plus its (defaulted) parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OperationDescriptor {
    pub operation: Operation,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl OperationDescriptor {
    /// The "not an operation" descriptor.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a descriptor, back-filling optional params from
    /// [`PARAM_DEFAULTS`]. A `None` operation always carries empty params.
    pub fn new(operation: Operation, mut params: BTreeMap<String, String>) -> Self {
        if operation == Operation::None {
            return Self::none();
        }
        for (key, value) in PARAM_DEFAULTS {
            params
                .entry((*key).to_string())
                .or_insert_with(|| (*value).to_string());
        }
        Self { operation, params }
    }

    pub fn is_operation(&self) -> bool {
        self.operation != Operation::None
    }

    /// Look up a parameter, treating empty strings as absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Outcome of dispatching one operation against the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub operation: String,
    /// Backend payload on success (always a JSON object).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok(operation: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            operation: operation.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            operation: operation.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_and_verbs_both_parse() {
        assert_eq!(Operation::from_wire("launch-vm"), Operation::Launch);
        assert_eq!(Operation::from_wire("launch"), Operation::Launch);
        assert_eq!(Operation::from_wire("list-vms"), Operation::List);
        assert_eq!(Operation::from_wire(" delete "), Operation::Delete);
        assert_eq!(Operation::from_wire(""), Operation::None);
        assert_eq!(
            Operation::from_wire("reboot-vm"),
            Operation::Unknown("reboot-vm".into())
        );
    }

    #[test]
    fn operation_serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_string(&Operation::List).unwrap(),
            r#""list-vms""#
        );
        let op: Operation = serde_json::from_str(r#""delete-vm""#).unwrap();
        assert_eq!(op, Operation::Delete);
    }

    #[test]
    fn launch_with_only_name_gets_defaults() {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), "web-1".to_string());
        let d = OperationDescriptor::new(Operation::Launch, params);
        assert_eq!(d.param("name"), Some("web-1"));
        assert_eq!(d.param("instance_type"), Some("t2.micro"));
        assert_eq!(d.param("region"), Some("us-east-1"));
    }

    #[test]
    fn explicit_params_are_not_overwritten() {
        let mut params = BTreeMap::new();
        params.insert("instance_type".to_string(), "m5.large".to_string());
        params.insert("region".to_string(), "eu-west-1".to_string());
        let d = OperationDescriptor::new(Operation::Launch, params);
        assert_eq!(d.param("instance_type"), Some("m5.large"));
        assert_eq!(d.param("region"), Some("eu-west-1"));
    }

    #[test]
    fn none_descriptor_drops_params() {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), "ignored".to_string());
        let d = OperationDescriptor::new(Operation::None, params);
        assert!(!d.is_operation());
        assert!(d.params.is_empty());
    }

    #[test]
    fn empty_param_reads_as_absent() {
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), String::new());
        let d = OperationDescriptor::new(Operation::Delete, params);
        assert_eq!(d.param("id"), None);
    }

    #[test]
    fn failed_result_omits_data() {
        let r = OperationResult::failed("delete-vm", "VM ID or name is required");
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("\"data\""));
        assert!(json.contains("VM ID or name is required"));
    }
}
