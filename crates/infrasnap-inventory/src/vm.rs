//! VM-rooted hierarchy traversal.
//!
//! Each VM is fetched in one expanded query (hardware and its
//! sub-collections arrive as flat relationship arrays) and then reshaped
//! into the owned tree: partitions under their disk, networks under their
//! NIC, port-group names onto NICs. Archived and orphaned VMs are skipped
//! — they are decommissioned or inconsistent records with no inventory
//! value.

use crate::doc::{field_id, truthy};
use crate::error::CollectResult;
use infrasnap_core::source::InventorySource;
use serde_json::Value;

/// Relationships expanded inline on every VM record.
pub const VM_RELATIONSHIPS: &str = "files,hardware,hardware.disks,hardware.networks,hardware.nics,hardware.partitions,hardware.storage_adapters,hardware.volumes,lans,system_services";

/// Decommissioned or inconsistent VM records carry no meaningful inventory.
pub fn is_decommissioned(vm: &Value) -> bool {
    truthy(vm.get("archived")) || truthy(vm.get("orphaned"))
}

/// VM-rooted traverser over an [`InventorySource`].
pub struct VmCollector<'a> {
    source: &'a dyn InventorySource,
}

impl<'a> VmCollector<'a> {
    pub fn new(source: &'a dyn InventorySource) -> Self {
        Self { source }
    }

    /// Schema attributes for the VM collection; resolved once per pass.
    pub async fn vm_attributes(&self) -> CollectResult<String> {
        Ok(self.source.collection_attributes("vms").await?)
    }

    /// Identifiers of every VM in scope: all of the provider's VMs, or a
    /// single named one.
    pub async fn vm_ids(
        &self,
        provider_id: &str,
        vm_name: Option<&str>,
    ) -> CollectResult<Vec<String>> {
        let filter = match vm_name {
            Some(name) => format!("name='{name}'"),
            None => format!("ems_id='{provider_id}'"),
        };
        Ok(self.source.list_ids("vms", &filter).await?)
    }

    /// Fetch and assemble one VM document. `None` means the VM was
    /// archived or orphaned and deliberately skipped.
    pub async fn collect(&self, vm_id: &str, attributes: &str) -> CollectResult<Option<Value>> {
        let expansion = format!("{attributes},{VM_RELATIONSHIPS}");
        let mut doc = self
            .source
            .fetch_entity("vms", vm_id, &expansion, Some("software"))
            .await?;

        if is_decommissioned(&doc) {
            tracing::debug!("VM {vm_id} is archived or orphaned; skipping");
            return Ok(None);
        }

        restructure(&mut doc);
        Ok(Some(doc))
    }
}

/// Turn flat relationship arrays into the owned tree.
pub(crate) fn restructure(doc: &mut Value) {
    nest_partitions(doc);
    nest_networks(doc);
    name_nic_lans(doc);
}

/// Move `hardware.partitions` under the owning disk, matched by disk
/// identity before sanitization strips the keys.
fn nest_partitions(doc: &mut Value) {
    let Some(hardware) = doc.get_mut("hardware").and_then(Value::as_object_mut) else {
        return;
    };
    let partitions = match hardware.remove("partitions") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let Some(disks) = hardware.get_mut("disks").and_then(Value::as_array_mut) else {
        return;
    };
    for disk in disks {
        let disk_id = field_id(disk, "id");
        let owned: Vec<Value> = partitions
            .iter()
            .filter(|p| disk_id.is_some() && field_id(p, "disk_id") == disk_id)
            .cloned()
            .collect();
        disk["partitions"] = Value::Array(owned);
    }
}

/// Move `hardware.networks` under the owning NIC, matched by device
/// identity.
fn nest_networks(doc: &mut Value) {
    let Some(hardware) = doc.get_mut("hardware").and_then(Value::as_object_mut) else {
        return;
    };
    let networks = match hardware.remove("networks") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let Some(nics) = hardware.get_mut("nics").and_then(Value::as_array_mut) else {
        return;
    };
    for nic in nics {
        let nic_id = field_id(nic, "id");
        let owned: Vec<Value> = networks
            .iter()
            .filter(|n| nic_id.is_some() && field_id(n, "device_id") == nic_id)
            .cloned()
            .collect();
        nic["networks"] = Value::Array(owned);
    }
}

/// Resolve each NIC's port group to its display name via the VM's lans.
fn name_nic_lans(doc: &mut Value) {
    let lan_names: Vec<(String, String)> = doc
        .get("lans")
        .and_then(Value::as_array)
        .map(|lans| {
            lans.iter()
                .filter_map(|lan| {
                    Some((
                        field_id(lan, "id")?,
                        lan.get("name")?.as_str()?.to_string(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    if lan_names.is_empty() {
        return;
    }

    let Some(nics) = doc
        .get_mut("hardware")
        .and_then(|h| h.get_mut("nics"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for nic in nics {
        let Some(lan_id) = field_id(nic, "lan_id") else {
            continue;
        };
        if let Some((_, name)) = lan_names.iter().find(|(id, _)| *id == lan_id) {
            nic["lan_name"] = Value::String(name.clone());
        }
    }
}
