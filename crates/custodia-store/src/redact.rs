//! Recursive, depth-bounded redaction of JSON records.

use serde_json::{Map, Value};
use tracing::warn;

use crate::compliance::ComplianceState;

/// Deepest container nesting that is inspected. The top-level record is
/// depth 0 and every nested object or array adds one level.
pub const MAX_REDACTION_DEPTH: usize = 5;

/// Replacement for containers nested deeper than [`MAX_REDACTION_DEPTH`].
pub const TRUNCATED_MARKER: &str = "[TRUNCATED]";

/// Return a redacted copy of `data`.
///
/// Non-object input is returned unchanged. For every key the current user
/// may not view, the value is masked with the field's pattern. Viewable
/// values are copied, descending into nested objects and into objects
/// inside arrays. Objects and arrays below the depth limit are replaced by
/// [`TRUNCATED_MARKER`] so unchecked data never leaks.
pub fn redact_value(state: &ComplianceState, data: &Value) -> Value {
    match data {
        Value::Object(map) if state.redaction.enabled => Value::Object(redact_object(state, map, 0)),
        other => other.clone(),
    }
}

fn redact_object(state: &ComplianceState, map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let out = if state.can_view_field(key) {
                redact_nested(state, key, value, depth + 1)
            } else {
                state.mask_field(key, value)
            };
            (key.clone(), out)
        })
        .collect()
}

fn redact_nested(state: &ComplianceState, key: &str, value: &Value, depth: usize) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) if depth >= MAX_REDACTION_DEPTH => {
            warn!(field = %key, depth, "redaction depth limit reached, truncating");
            Value::String(TRUNCATED_MARKER.to_string())
        }
        Value::Object(map) => Value::Object(redact_object(state, map, depth)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_nested(state, key, item, depth + 1))
                .collect(),
        ),
        other => other.clone(),
    }
}
