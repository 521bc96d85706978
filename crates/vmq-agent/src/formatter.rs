//! User-facing rendering of operation results.

use vmq_protocol::{Operation, OperationDescriptor, OperationResult, vm_entries};

const MISSING: &str = "N/A";

/// Render a dispatched operation as a single message.
pub fn format_operation(result: &OperationResult, descriptor: &OperationDescriptor) -> String {
    if !result.success {
        let error = result.error.as_deref().unwrap_or("Unknown error");
        return format!("Error performing {}: {error}", result.operation);
    }

    let empty = serde_json::Value::Null;
    let data = result.data.as_ref().unwrap_or(&empty);

    match descriptor.operation {
        Operation::Launch => format!(
            "VM launched successfully!\n\
             Instance ID: {}\n\
             Name: {}\n\
             SSH Port: {}\n\
             Message: {}",
            field(data, "instance_id"),
            descriptor.param("name").unwrap_or(MISSING),
            field(data, "ssh_port"),
            field(data, "message"),
        ),
        Operation::List => format_vm_list(data),
        Operation::Delete => {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or("VM removed");
            format!("VM deleted successfully!\n{message}")
        }
        Operation::None | Operation::Unknown(_) => format!("{} completed", result.operation),
    }
}

/// Retrieval answers are shown as the model wrote them.
pub fn format_answer(answer: &str) -> String {
    answer.to_string()
}

fn format_vm_list(data: &serde_json::Value) -> String {
    let vms = vm_entries(data);
    if vms.is_empty() {
        return "No VMs found.".into();
    }

    let mut out = format!("Found {} VM(s):\n\n", vms.len());
    for vm in vms {
        out.push_str(&format!(
            "  • {} (ID: {}, SSH Port: {}, PID: {})\n",
            field(vm, "name"),
            field(vm, "id"),
            field(vm, "ssh_port"),
            field(vm, "pid"),
        ));
    }
    out
}

/// A JSON field as display text; strings unquoted, absent or null as `N/A`.
fn field(value: &serde_json::Value, key: &str) -> String {
    match value.get(key) {
        None | Some(serde_json::Value::Null) => MISSING.into(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Shorten `text` to at most `max` characters, appending `...` when cut.
pub fn truncate_for_display(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
