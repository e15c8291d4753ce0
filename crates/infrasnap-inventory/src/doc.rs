//! Shared record helpers for assembled documents.
//!
//! Identity keys arrive as numbers or strings depending on the source
//! serializer, so cross-record matching always goes through a canonical
//! string form.

use serde_json::Value;

/// Canonical string form of an identity value.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical string form of `record[key]`, when present.
pub(crate) fn field_id(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(id_string)
}

/// Loose truthiness over source-reported flags: booleans, 0/1 counters,
/// and stringified booleans all occur in the wild.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_strings_unify_numbers_and_strings() {
        assert_eq!(
            field_id(&json!({"disk_id": 7}), "disk_id"),
            field_id(&json!({"id": "7"}), "id")
        );
        assert_eq!(field_id(&json!({"id": null}), "id"), None);
    }

    #[test]
    fn truthy_covers_source_flag_shapes() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("true"))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(false))));
        assert!(!truthy(Some(&json!("false"))));
        assert!(!truthy(None));
    }
}
