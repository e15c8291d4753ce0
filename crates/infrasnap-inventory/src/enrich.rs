//! Additive protocol enrichment.
//!
//! When management-protocol credentials are available, a session is opened
//! against the provider's endpoint (resolved from the already-traversed
//! provider document) and strictly additive fields are attached: product
//! info, license assignments, and registered extensions on the provider;
//! live adapter classification on VM NICs. Without credentials the
//! enricher never runs; with them, every failure is a logged warning and
//! the entity is emitted unenriched.

use infrasnap_protocol::{AdapterInfo, ProtocolConnector, ProtocolSource};
use serde::Serialize;
use serde_json::Value;

/// Stateful enricher: one protocol session per run, opened lazily at the
/// provider's endpoint address and reused for the VM pass.
pub struct ProtocolEnricher {
    connector: Option<Box<dyn ProtocolConnector>>,
    session: Option<Box<dyn ProtocolSource>>,
    failed: bool,
}

impl ProtocolEnricher {
    /// No-credentials variant; every enrich call is a no-op.
    pub fn disabled() -> Self {
        Self {
            connector: None,
            session: None,
            failed: false,
        }
    }

    pub fn new(connector: Box<dyn ProtocolConnector>) -> Self {
        Self {
            connector: Some(connector),
            session: None,
            failed: false,
        }
    }

    async fn session(&mut self, host: &str) -> Option<&dyn ProtocolSource> {
        if self.failed {
            return None;
        }
        let connector = self.connector.as_ref()?;
        if self.session.is_none() {
            match connector.open(host).await {
                Ok(session) => self.session = Some(session),
                Err(e) => {
                    tracing::warn!(
                        "management-protocol session to {host} failed ({e}); continuing without enrichment"
                    );
                    self.failed = true;
                    return None;
                }
            }
        }
        self.session.as_deref()
    }

    /// Attach product info, licenses, and registered extensions to a
    /// provider document.
    pub async fn enrich_provider(&mut self, doc: &mut Value) {
        if self.connector.is_none() {
            return;
        }
        let Some(host) = endpoint_address(doc) else {
            tracing::warn!("provider document has no address or hostname; skipping enrichment");
            return;
        };
        let Some(session) = self.session(&host).await else {
            return;
        };

        match session.service_info().await {
            Ok(info) => attach(doc, "product_info", &info),
            Err(e) => tracing::warn!("service info unavailable: {e}"),
        }
        match session.assigned_licenses().await {
            Ok(licenses) => attach(doc, "licenses", &licenses),
            Err(e) => tracing::warn!("license assignments unavailable: {e}"),
        }
        match session.registered_extensions().await {
            Ok(extensions) => attach(doc, "registered_extensions", &extensions),
            Err(e) => tracing::warn!("registered extensions unavailable: {e}"),
        }
    }

    /// Attach live adapter classification to a VM document's NICs. Reuses
    /// the session opened during the provider pass.
    pub async fn enrich_vm(&mut self, doc: &mut Value) {
        let Some(session) = self.session.as_deref() else {
            return;
        };
        let Some(name) = doc.get("name").and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        match session.ethernet_adapters(&name).await {
            Ok(adapters) => attach_adapter_types(doc, &adapters),
            Err(e) => tracing::warn!("live adapters for VM '{name}' unavailable: {e}"),
        }
    }

}

/// The endpoint a protocol session should target, from a provider record.
fn endpoint_address(doc: &Value) -> Option<String> {
    doc.get("ipaddress")
        .and_then(Value::as_str)
        .or_else(|| doc.get("hostname").and_then(Value::as_str))
        .map(str::to_string)
}

fn attach<T: Serialize>(doc: &mut Value, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(v) => {
            doc[key] = v;
        }
        Err(e) => tracing::warn!("could not attach '{key}': {e}"),
    }
}

/// Classify each NIC by device-label equality against the live adapter
/// list. Labels are not guaranteed unique after renames; the first match
/// in device order wins. No match leaves the field absent.
pub(crate) fn attach_adapter_types(doc: &mut Value, adapters: &[AdapterInfo]) {
    let Some(nics) = doc
        .get_mut("hardware")
        .and_then(|h| h.get_mut("nics"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for nic in nics {
        let Some(label) = nic.get("device_name").and_then(Value::as_str) else {
            continue;
        };
        if let Some(adapter) = adapters.iter().find(|a| a.label == label) {
            nic["adapter_type"] = Value::String(adapter.adapter_type.clone());
        }
    }
}
