//! Field-level diffs for audit entries

use serde_json::Value;

/// Fields that change on every write and say nothing about the edit
const IGNORED_FIELDS: &[&str] = &["updated_at"];

/// Summarize top-level field changes between two JSON objects
///
/// Returns `None` when nothing meaningful changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let (Value::Object(before_obj), Value::Object(after_obj)) = (before, after) else {
        return (before != after)
            .then(|| format!("{} -> {}", format_value(before), format_value(after)));
    };

    let mut changes = Vec::new();

    for (key, old) in before_obj {
        if IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match after_obj.get(key) {
            Some(new) if new != old => changes.push(format!(
                "{}: {} -> {}",
                key,
                format_value(old),
                format_value(new)
            )),
            Some(_) => {}
            None => changes.push(format!("{}: {} -> (removed)", key, format_value(old))),
        }
    }

    for (key, new) in after_obj {
        if !before_obj.contains_key(key) && !IGNORED_FIELDS.contains(&key.as_str()) {
            changes.push(format!("{}: (added) -> {}", key, format_value(new)));
        }
    }

    (!changes.is_empty()).then(|| changes.join(", "))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(_) => "{...}".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_fields_listed() {
        let before = json!({"amount": 5000, "description": "Market", "envelope_id": null});
        let after = json!({"amount": 3000, "description": "Market", "envelope_id": "e1"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("amount: 5000 -> 3000"));
        assert!(diff.contains("envelope_id: null -> \"e1\""));
        assert!(!diff.contains("description"));
    }

    #[test]
    fn test_timestamp_only_change_is_no_diff() {
        let before = json!({"name": "Rent", "updated_at": "2025-01-01T00:00:00Z"});
        let after = json!({"name": "Rent", "updated_at": "2025-01-02T00:00:00Z"});
        assert_eq!(generate_diff(&before, &after), None);
    }

    #[test]
    fn test_added_and_removed_fields() {
        let diff = generate_diff(&json!({"a": 1}), &json!({"b": 2})).unwrap();
        assert!(diff.contains("a: 1 -> (removed)"));
        assert!(diff.contains("b: (added) -> 2"));
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(generate_diff(&json!(1), &json!(2)).as_deref(), Some("1 -> 2"));
        assert_eq!(generate_diff(&json!(1), &json!(1)), None);
    }
}
