//! Provider-rooted hierarchy traversal.
//!
//! Resolves exactly one provider, then expands its tree depth-first:
//! datacenters (derived from the clusters' parent-datacenter attribute),
//! clusters, hosts, and the hosts' switches and datastores. Datastore
//! scope is exclusive: a single-host datastore lands under its host, a
//! multi-host datastore lands under the datacenter's shared list — never
//! both.

use crate::doc::{field_id, truthy};
use crate::error::{degrade, CollectError, CollectResult};
use infrasnap_core::error::SourceResult;
use infrasnap_core::source::InventorySource;
use serde_json::{json, Value};

/// Relationships expanded inline on every host record.
pub const HOST_RELATIONSHIPS: &str = "switches,storages";

/// Kind of a host-attached virtual switch.
///
/// Decided once, at fetch time, from the record's type field; everything
/// downstream works with the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    Host,
    Distributed,
}

impl SwitchKind {
    pub fn of(record: &Value) -> Self {
        let type_name = record.get("type").and_then(Value::as_str).unwrap_or("");
        if type_name.contains("DistributedVirtualSwitch") {
            Self::Distributed
        } else {
            Self::Host
        }
    }
}

/// A multi-host datastore belongs to the datacenter, not to any one host.
pub fn is_shared_datastore(datastore: &Value) -> bool {
    truthy(datastore.get("multiplehostaccess"))
}

/// Port-count keys on host records are per-switch noise the source also
/// reports flattened onto the host; they are dropped at fetch time.
fn is_enabled_ports_key(key: &str) -> bool {
    key.find("enabled")
        .map(|at| key[at..].contains("ports"))
        .unwrap_or(false)
}

/// Multi-host datastores collected across the traversal, deduplicated by
/// identity key, each remembering which hosts referenced it.
#[derive(Default)]
struct SharedDatastores {
    entries: Vec<(String, Value, Vec<String>)>,
}

impl SharedDatastores {
    fn add(&mut self, id: String, record: Value, host: Option<String>) {
        if let Some((_, _, hosts)) = self.entries.iter_mut().find(|(known, _, _)| *known == id) {
            if let Some(host) = host {
                if !hosts.contains(&host) {
                    hosts.push(host);
                }
            }
        } else {
            self.entries.push((id, record, host.into_iter().collect()));
        }
    }

    fn into_values(self) -> Vec<Value> {
        self.entries
            .into_iter()
            .map(|(_, mut record, hosts)| {
                record["hosts"] = json!(hosts);
                record
            })
            .collect()
    }
}

/// Provider-rooted traverser over an [`InventorySource`].
pub struct ProviderCollector<'a> {
    source: &'a dyn InventorySource,
}

impl<'a> ProviderCollector<'a> {
    pub fn new(source: &'a dyn InventorySource) -> Self {
        Self { source }
    }

    /// Resolve exactly one provider.
    ///
    /// Zero candidates is fatal; more than one is fatal unless a
    /// disambiguating name was supplied.
    pub async fn select_provider(
        &self,
        provider_type: Option<&str>,
        name: Option<&str>,
    ) -> CollectResult<String> {
        if let Some(name) = name {
            let mut ids = self
                .source
                .list_ids("providers", &format!("name='{name}'"))
                .await?;
            if ids.is_empty() {
                return Err(CollectError::selection(format!(
                    "Provider '{name}' not found"
                )));
            }
            return Ok(ids.remove(0));
        }

        let filter = provider_type
            .map(|t| format!("type='{t}'"))
            .unwrap_or_default();
        let mut ids = self.source.list_ids("providers", &filter).await?;
        match ids.len() {
            0 => Err(CollectError::selection("No matching provider has been found")),
            1 => Ok(ids.remove(0)),
            _ => Err(CollectError::selection(
                "Multiple providers have been found, specify a provider name",
            )),
        }
    }

    /// Assemble the full provider document. Root schema resolution and the
    /// root entity lookup are the only fatal steps; every branch below
    /// degrades to an empty collection on failure.
    pub async fn collect(&self, provider_id: &str) -> CollectResult<Value> {
        let attributes = self.source.collection_attributes("providers").await?;
        let mut doc = self
            .source
            .fetch_entity("providers", provider_id, &attributes, None)
            .await?;

        let mut shared = SharedDatastores::default();
        let clusters = degrade("clusters", self.clusters(provider_id, &mut shared).await);
        attach_datacenters(&mut doc, clusters, shared.into_values());
        Ok(doc)
    }

    async fn clusters(
        &self,
        provider_id: &str,
        shared: &mut SharedDatastores,
    ) -> SourceResult<Vec<Value>> {
        let attributes = self.source.collection_attributes("clusters").await?;
        let ids = self
            .source
            .list_ids("clusters", &format!("ems_id={provider_id}"))
            .await?;

        let mut clusters = Vec::with_capacity(ids.len());
        for id in ids {
            let mut cluster = match self
                .source
                .fetch_entity("clusters", &id, &attributes, None)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("cluster {id} could not be expanded ({e}); skipping");
                    continue;
                }
            };
            let hosts = degrade(
                &format!("hosts of cluster {id}"),
                self.hosts(&id, shared).await,
            );
            cluster["hosts"] = Value::Array(hosts);
            clusters.push(cluster);
        }
        Ok(clusters)
    }

    async fn hosts(
        &self,
        cluster_id: &str,
        shared: &mut SharedDatastores,
    ) -> SourceResult<Vec<Value>> {
        let attributes = self.source.collection_attributes("hosts").await?;
        let expansion = format!("{attributes},{HOST_RELATIONSHIPS}");
        let ids = self
            .source
            .list_ids("hosts", &format!("ems_cluster_id={cluster_id}"))
            .await?;

        let mut hosts = Vec::with_capacity(ids.len());
        for id in ids {
            let mut host = match self
                .source
                .fetch_entity("hosts", &id, &expansion, None)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("host {id} could not be expanded ({e}); skipping");
                    continue;
                }
            };
            shape_host(&mut host, shared);
            hosts.push(host);
        }
        Ok(hosts)
    }
}

/// Reshape a raw host record: split switches by kind, keep only
/// single-host datastores locally, route the rest to the shared set.
fn shape_host(host: &mut Value, shared: &mut SharedDatastores) {
    let Some(map) = host.as_object_mut() else {
        return;
    };
    map.retain(|key, _| !is_enabled_ports_key(key));
    let host_name = map
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);

    let switches = match map.remove("switches") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let mut host_switches = Vec::new();
    let mut distributed_switches = Vec::new();
    for switch in &switches {
        let shaped = shape_switch(switch);
        match SwitchKind::of(switch) {
            SwitchKind::Host => host_switches.push(shaped),
            SwitchKind::Distributed => distributed_switches.push(shaped),
        }
    }
    map.insert("host_switches".into(), Value::Array(host_switches));
    map.insert(
        "distributed_switches".into(),
        Value::Array(distributed_switches),
    );

    let storages = match map.remove("storages") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let mut local = Vec::new();
    for datastore in storages {
        if is_shared_datastore(&datastore) {
            match field_id(&datastore, "id") {
                Some(id) => shared.add(id, datastore, host_name.clone()),
                None => tracing::debug!("shared datastore without identity key dropped"),
            }
        } else {
            local.push(datastore);
        }
    }
    map.insert("datastores".into(), Value::Array(local));
}

fn shape_switch(switch: &Value) -> Value {
    let port_groups: Vec<Value> = switch
        .get("lans")
        .and_then(Value::as_array)
        .map(|lans| {
            lans.iter()
                .map(|lan| {
                    json!({
                        "name": lan.get("name").cloned().unwrap_or(Value::Null),
                        "tag": lan.get("tag").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "name": switch.get("name").cloned().unwrap_or(Value::Null),
        "ports": switch.get("ports").cloned().unwrap_or(Value::Null),
        "port_groups": port_groups,
    })
}

/// Group clusters under their parent datacenter; every datacenter also
/// carries the provider-wide shared datastore list. Clusters with no
/// datacenter attribute stay directly under the provider.
fn attach_datacenters(doc: &mut Value, clusters: Vec<Value>, shared: Vec<Value>) {
    if !doc.is_object() {
        return;
    }

    let mut named: Vec<(String, Vec<Value>)> = Vec::new();
    let mut unplaced: Vec<Value> = Vec::new();
    for cluster in clusters {
        let datacenter = cluster
            .get("v_parent_datacenter")
            .and_then(Value::as_str)
            .map(str::to_string);
        match datacenter {
            Some(name) if !name.is_empty() => {
                if let Some((_, list)) = named.iter_mut().find(|(known, _)| *known == name) {
                    list.push(cluster);
                } else {
                    named.push((name, vec![cluster]));
                }
            }
            _ => unplaced.push(cluster),
        }
    }

    if named.is_empty() {
        doc["clusters"] = Value::Array(unplaced);
        doc["shared_datastores"] = Value::Array(shared);
        return;
    }

    let datacenters: Vec<Value> = named
        .into_iter()
        .map(|(name, clusters)| {
            json!({
                "name": name,
                "clusters": clusters,
                "shared_datastores": shared.clone(),
            })
        })
        .collect();
    doc["datacenters"] = Value::Array(datacenters);
    if !unplaced.is_empty() {
        doc["clusters"] = Value::Array(unplaced);
    }
}
