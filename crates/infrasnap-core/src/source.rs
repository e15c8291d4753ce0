//! Capability trait for the paginated inventory query interface.
//!
//! The traversers only ever talk to this trait; the REST client is the
//! production implementation and tests supply in-memory fixtures. Keeping
//! the seam here means the hierarchy logic never touches HTTP.

use crate::error::{SourceError, SourceResult};
use async_trait::async_trait;
use serde_json::Value;

/// A paginated, schema-introspectable inventory data source.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Comma-joined queryable attribute list for a collection — concrete
    /// plus virtual attributes, minus internal identifier fields.
    /// Memoized per collection for the run.
    async fn collection_attributes(&self, collection: &str) -> SourceResult<String>;

    /// Every record of `collection` matching `filter`, in page order.
    /// Requests only `attributes` (identifiers when `None`), transparently
    /// following continuation links.
    async fn list(
        &self,
        collection: &str,
        filter: &str,
        attributes: Option<&str>,
    ) -> SourceResult<Vec<Value>>;

    /// One fully expanded record.
    async fn fetch_entity(
        &self,
        collection: &str,
        id: &str,
        attributes: &str,
        expand: Option<&str>,
    ) -> SourceResult<Value>;

    /// Identifier-only variant of [`list`](Self::list).
    async fn list_ids(&self, collection: &str, filter: &str) -> SourceResult<Vec<String>> {
        let records = self.list(collection, filter, None).await?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(entity_id(&record)?);
        }
        Ok(ids)
    }
}

/// The identity key of a source record, as an opaque string.
pub fn entity_id(record: &Value) -> SourceResult<String> {
    match record.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SourceError::parse("record has no usable 'id' field")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_id_accepts_string_and_number() {
        assert_eq!(entity_id(&json!({"id": "1000000000001"})).unwrap(), "1000000000001");
        assert_eq!(entity_id(&json!({"id": 42})).unwrap(), "42");
    }

    #[test]
    fn entity_id_rejects_missing_or_null() {
        assert!(entity_id(&json!({"name": "x"})).is_err());
        assert!(entity_id(&json!({"id": null})).is_err());
    }
}
