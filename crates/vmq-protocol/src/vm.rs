//! VM listings as returned by the backend's `/list-vms` endpoint.
//!
//! Entries stay raw JSON maps so fields this side doesn't know about survive
//! into `OperationResult::data`.

/// Normalize a `/list-vms` body to `{"vms": [...]}`.
///
/// The backend answers with either a bare array or an object carrying a
/// `vms` key. An object without `vms` normalizes to an empty list.
pub fn normalize_vm_list(body: serde_json::Value) -> serde_json::Value {
    let vms = match body {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("vms") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    serde_json::json!({ "vms": vms })
}

/// Pull the raw VM entries out of a normalized list payload.
pub fn vm_entries(normalized: &serde_json::Value) -> &[serde_json::Value] {
    normalized
        .get("vms")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Id of the first VM whose name matches exactly (case-sensitive).
///
/// Scanning stops at the first name hit. A numeric id is stringified; a hit
/// with no usable id yields `None` rather than falling through to a later
/// entry.
pub fn find_vm_id_by_name(normalized: &serde_json::Value, name: &str) -> Option<String> {
    let hit = vm_entries(normalized)
        .iter()
        .find(|vm| vm.get("name").and_then(|n| n.as_str()) == Some(name))?;
    match hit.get("id")? {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
