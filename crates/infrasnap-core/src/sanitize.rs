//! Recursive document sanitizer.
//!
//! Snapshot documents are arbitrarily nested `serde_json::Value` trees.
//! Before serialization every object is stripped of keys whose value is
//! null or a blank string, and of internal identifier keys (`id` and any
//! `*_id`) — those only cross-reference records inside the source system
//! and mean nothing to a snapshot consumer.
//!
//! Array elements are recursed into but never removed: only object keys
//! are filtered, so a null or empty scalar inside an array survives.
//! Consumers index some arrays positionally, which is why the asymmetry
//! is kept.

use serde_json::Value;

/// Internal-identifier naming convention: `id` itself or an `_id` suffix.
pub fn is_internal_id_key(key: &str) -> bool {
    key == "id" || key.ends_with("_id")
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// Sanitize a document in place, depth-first.
///
/// Idempotent; a no-op on scalars and empty containers. The input must be
/// a tree (the traversers only ever build trees), so recursion terminates.
pub fn sanitize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|k, v| !(v.is_null() || is_blank(v) || is_internal_id_key(k)));
            for child in map.values_mut() {
                if child.is_object() || child.is_array() {
                    sanitize(child);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                if item.is_object() || item.is_array() {
                    sanitize(item);
                }
            }
        }
        _ => {}
    }
}
