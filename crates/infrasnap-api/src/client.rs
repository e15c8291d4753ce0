//! Management REST API client.
//!
//! Implements the three query operations the traversers need:
//!
//! - schema resolution: `OPTIONS /api/<collection>` → attribute list,
//!   memoized per collection for the run
//! - paginated listing: `GET /api/<collection>?filter[]=...&expand=resources`,
//!   following `links.next` until no continuation remains
//! - entity expansion: `GET /api/<collection>/<id>?attributes=...`

use crate::transport::RestTransport;
use async_trait::async_trait;
use infrasnap_core::error::{SourceError, SourceResult};
use infrasnap_core::source::InventorySource;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use url::Url;

/// REST client over a [`RestTransport`].
pub struct ApiClient<T: RestTransport> {
    transport: T,
    base: Url,
    schema_cache: Mutex<HashMap<String, String>>,
}

impl<T: RestTransport> ApiClient<T> {
    /// Client for `https://{server}/api`.
    pub fn new(server: &str, transport: T) -> SourceResult<Self> {
        let base = Url::parse(&format!("https://{server}/api"))
            .map_err(|e| SourceError::other(format!("Invalid server '{server}': {e}")))?;
        Ok(Self {
            transport,
            base,
            schema_cache: Mutex::new(HashMap::new()),
        })
    }

    fn collection_url(
        &self,
        collection: &str,
        id: Option<&str>,
        params: &[(&str, &str)],
    ) -> SourceResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SourceError::other("API base URL cannot hold path segments"))?;
            segments.push(collection);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl<T: RestTransport> InventorySource for ApiClient<T> {
    async fn collection_attributes(&self, collection: &str) -> SourceResult<String> {
        {
            let cache = self.schema_cache.lock().await;
            if let Some(cached) = cache.get(collection) {
                return Ok(cached.clone());
            }
        }

        let url = self.collection_url(collection, None, &[])?;
        tracing::debug!(collection, "resolving collection schema");
        let meta = self.transport.options_json(url.as_str()).await.map_err(|e| {
            SourceError::schema(format!("schema query for '{collection}' failed: {e}"))
        })?;

        let joined = join_queryable_attributes(&meta);
        if joined.is_empty() {
            return Err(SourceError::schema(format!(
                "collection '{collection}' reported no queryable attributes"
            )));
        }

        self.schema_cache
            .lock()
            .await
            .insert(collection.to_string(), joined.clone());
        Ok(joined)
    }

    async fn list(
        &self,
        collection: &str,
        filter: &str,
        attributes: Option<&str>,
    ) -> SourceResult<Vec<Value>> {
        let attributes = attributes.unwrap_or("id");
        let mut params: Vec<(&str, &str)> = Vec::new();
        if !filter.is_empty() {
            params.push(("filter[]", filter));
        }
        params.push(("expand", "resources"));
        params.push(("attributes", attributes));

        let url = self.collection_url(collection, None, &params)?;
        tracing::debug!(collection, filter, "listing collection");
        let mut envelope = self.transport.get_json(url.as_str()).await?;
        let mut records = take_resources(&mut envelope, collection)?;

        // Continuation chain. A repeated next link would mean the server is
        // looping; abort rather than revisit a page.
        if envelope.get("pages").and_then(Value::as_u64).unwrap_or(1) > 1 {
            let mut visited: HashSet<String> = HashSet::new();
            while let Some(next) = continuation(&envelope) {
                if !visited.insert(next.clone()) {
                    return Err(SourceError::other(format!(
                        "pagination loop detected for '{collection}' at {next}"
                    )));
                }
                envelope = self.transport.get_json(&next).await?;
                records.extend(take_resources(&mut envelope, collection)?);
            }
        }

        Ok(records)
    }

    async fn fetch_entity(
        &self,
        collection: &str,
        id: &str,
        attributes: &str,
        expand: Option<&str>,
    ) -> SourceResult<Value> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(expand) = expand {
            params.push(("expand", expand));
        }
        params.push(("attributes", attributes));

        let url = self.collection_url(collection, Some(id), &params)?;
        tracing::debug!(collection, id, "fetching entity");
        self.transport.get_json(url.as_str()).await
    }
}

/// Union of `attributes` and `virtual_attributes`, in response order,
/// deduplicated, minus internal-identifier names (`_id` suffix), joined
/// into a request fragment.
fn join_queryable_attributes(meta: &Value) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<&str> = Vec::new();
    for key in ["attributes", "virtual_attributes"] {
        let Some(names) = meta.get(key).and_then(Value::as_array) else {
            continue;
        };
        for name in names.iter().filter_map(Value::as_str) {
            if !name.ends_with("_id") && seen.insert(name) {
                out.push(name);
            }
        }
    }
    out.join(",")
}

fn take_resources(envelope: &mut Value, collection: &str) -> SourceResult<Vec<Value>> {
    match envelope.get_mut("resources") {
        Some(Value::Array(items)) => Ok(std::mem::take(items)),
        _ => Err(SourceError::parse(format!(
            "list response for '{collection}' carries no 'resources' array"
        ))),
    }
}

fn continuation(envelope: &Value) -> Option<String> {
    envelope
        .get("links")
        .and_then(|links| links.get("next"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
