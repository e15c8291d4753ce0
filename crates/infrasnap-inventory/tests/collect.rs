//! End-to-end collection runs against in-memory fixtures.

use async_trait::async_trait;
use infrasnap_core::config::RunConfig;
use infrasnap_core::error::{SourceError, SourceResult};
use infrasnap_core::source::InventorySource;
use infrasnap_inventory::enrich::ProtocolEnricher;
use infrasnap_inventory::error::CollectResult;
use infrasnap_inventory::run::run;
use infrasnap_inventory::snapshot::{SnapshotKind, SnapshotWriter};
use infrasnap_protocol::error::{ProtocolError, ProtocolResult};
use infrasnap_protocol::{
    AdapterInfo, ExtensionRecord, LicenseRecord, ProtocolConnector, ProtocolSource, ServiceInfo,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

// ── Inventory fixture ─────────────────────────────────────────────────

/// In-memory collections with a minimal `key='value'` filter matcher.
struct FixtureInventory {
    collections: HashMap<String, Vec<Value>>,
    attributes: HashMap<String, String>,
}

impl FixtureInventory {
    fn new() -> Self {
        Self {
            collections: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    fn with(mut self, collection: &str, attributes: &str, records: Vec<Value>) -> Self {
        self.collections.insert(collection.to_string(), records);
        self.attributes
            .insert(collection.to_string(), attributes.to_string());
        self
    }

    fn matches(record: &Value, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let Some((key, raw)) = filter.split_once('=') else {
            return false;
        };
        let wanted = raw.trim_matches('\'');
        match record.get(key) {
            Some(Value::String(s)) => s == wanted,
            Some(Value::Number(n)) => n.to_string() == wanted,
            _ => false,
        }
    }
}

#[async_trait]
impl InventorySource for FixtureInventory {
    async fn collection_attributes(&self, collection: &str) -> SourceResult<String> {
        self.attributes
            .get(collection)
            .cloned()
            .ok_or_else(|| SourceError::schema(format!("unknown collection '{collection}'")))
    }

    async fn list(
        &self,
        collection: &str,
        filter: &str,
        _attributes: Option<&str>,
    ) -> SourceResult<Vec<Value>> {
        let records = self
            .collections
            .get(collection)
            .ok_or_else(|| SourceError::schema(format!("unknown collection '{collection}'")))?;
        Ok(records
            .iter()
            .filter(|r| Self::matches(r, filter))
            .cloned()
            .collect())
    }

    async fn fetch_entity(
        &self,
        collection: &str,
        id: &str,
        _attributes: &str,
        _expand: Option<&str>,
    ) -> SourceResult<Value> {
        let records = self
            .collections
            .get(collection)
            .ok_or_else(|| SourceError::schema(format!("unknown collection '{collection}'")))?;
        records
            .iter()
            .find(|r| Self::matches(r, &format!("id={id}")))
            .cloned()
            .ok_or_else(|| SourceError::transport(404, format!("{collection}/{id} not found"), ""))
    }
}

// ── Protocol fixture ──────────────────────────────────────────────────

struct FixtureProtocol;

#[async_trait]
impl ProtocolSource for FixtureProtocol {
    async fn service_info(&self) -> ProtocolResult<ServiceInfo> {
        Ok(ServiceInfo {
            full_name: "Fixture Server 8.0.2".to_string(),
            version: Some("8.0.2".to_string()),
            build: Some("22617221".to_string()),
        })
    }

    async fn assigned_licenses(&self) -> ProtocolResult<Vec<LicenseRecord>> {
        Ok(vec![LicenseRecord {
            name: "Fixture Standard".to_string(),
            license_key: "AAAAA-BBBBB".to_string(),
            edition_key: Some("std".to_string()),
            total: Some(64),
            used: Some(12),
            properties: serde_json::Map::new(),
        }])
    }

    async fn registered_extensions(&self) -> ProtocolResult<Vec<ExtensionRecord>> {
        Ok(vec![ExtensionRecord {
            key: "com.fixture.nsx".to_string(),
            company: Some("Fixture".to_string()),
            label: Some("Network Platform".to_string()),
            summary: None,
            version: Some("4.1".to_string()),
            servers: Vec::new(),
        }])
    }

    async fn ethernet_adapters(&self, _vm_name: &str) -> ProtocolResult<Vec<AdapterInfo>> {
        Ok(vec![AdapterInfo {
            label: "Network adapter 1".to_string(),
            adapter_type: "VMXNET3".to_string(),
        }])
    }
}

struct FixtureConnector {
    refuse: bool,
}

#[async_trait]
impl ProtocolConnector for FixtureConnector {
    async fn open(&self, host: &str) -> ProtocolResult<Box<dyn ProtocolSource>> {
        if self.refuse {
            return Err(ProtocolError::connection(format!("{host} unreachable")));
        }
        Ok(Box::new(FixtureProtocol))
    }
}

// ── Snapshot capture ──────────────────────────────────────────────────

#[derive(Default)]
struct MemoryWriter {
    written: Mutex<Vec<(SnapshotKind, String, Value)>>,
}

impl MemoryWriter {
    fn take(&self) -> Vec<(SnapshotKind, String, Value)> {
        std::mem::take(&mut self.written.lock().unwrap())
    }
}

impl SnapshotWriter for MemoryWriter {
    fn write(&self, kind: SnapshotKind, name: &str, document: &Value) -> CollectResult<PathBuf> {
        self.written
            .lock()
            .unwrap()
            .push((kind, name.to_string(), document.clone()));
        Ok(PathBuf::from(format!("{name}.json")))
    }
}

// ── Fixture data ──────────────────────────────────────────────────────

fn lab_inventory() -> FixtureInventory {
    FixtureInventory::new()
        .with(
            "providers",
            "name,type,hostname,ipaddress,api_version",
            vec![json!({
                "id": 1,
                "name": "vc01",
                "type": "Vendor::Infra::Provider",
                "hostname": "vc01.lab.local",
                "ipaddress": "10.0.0.2",
                "api_version": "7.0",
            })],
        )
        .with(
            "clusters",
            "name,v_parent_datacenter,effective_cpu",
            vec![json!({
                "id": 10,
                "ems_id": 1,
                "name": "cluster-a",
                "v_parent_datacenter": "DC1",
                "effective_cpu": 52000,
            })],
        )
        .with(
            "hosts",
            "name,vmm_product,vmm_version",
            vec![
                json!({
                    "id": 100,
                    "ems_cluster_id": 10,
                    "name": "esx01",
                    "vmm_product": "ESXi",
                    "enabled_tcp_inbound_ports": [443],
                    "switches": [
                        {"name": "vSwitch0", "ports": 128, "type": "X::HostVirtualSwitch",
                         "lans": [{"name": "VM Network", "tag": "0"}]},
                    ],
                    "storages": [
                        {"id": 500, "name": "local-esx01", "multiplehostaccess": 0},
                        {"id": 600, "name": "san-shared", "multiplehostaccess": 1},
                    ],
                }),
                json!({
                    "id": 101,
                    "ems_cluster_id": 10,
                    "name": "esx02",
                    "vmm_product": "ESXi",
                    "switches": [],
                    "storages": [
                        {"id": 600, "name": "san-shared", "multiplehostaccess": 1},
                    ],
                }),
            ],
        )
        .with(
            "vms",
            "name,power_state,cpu_total_cores",
            vec![
                json!({
                    "id": 1000,
                    "ems_id": 1,
                    "name": "web01",
                    "power_state": "on",
                    "hardware": {
                        "disks": [{"id": 5, "device_name": "Hard disk 1"}],
                        "partitions": [{"disk_id": 5, "name": "sda1", "size": 1024}],
                        "nics": [{"id": 7, "device_name": "Network adapter 1", "lan_id": 9}],
                        "networks": [{"device_id": 7, "ipaddress": "10.0.1.21"}],
                    },
                    "lans": [{"id": 9, "name": "VM Network"}],
                }),
                json!({
                    "id": 1001,
                    "ems_id": 1,
                    "name": "retired01",
                    "archived": true,
                }),
                json!({
                    "id": 1002,
                    "ems_id": 1,
                    "name": "db01",
                    "power_state": "on",
                    "cpu_total_cores": 8,
                }),
            ],
        )
}

fn lab_config() -> RunConfig {
    RunConfig::new("cfme.lab.local", "token")
}

// ── Tests ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_writes_one_provider_and_skips_decommissioned_vms() {
    let source = lab_inventory();
    let writer = MemoryWriter::default();

    let summary = run(&lab_config(), &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap();
    assert_eq!(summary.providers_written, 1);
    assert_eq!(summary.vms_written, 2);
    assert!(summary.failed.is_empty());

    let written = writer.take();
    assert_eq!(written.len(), 3);

    let (kind, name, provider) = &written[0];
    assert_eq!(*kind, SnapshotKind::Provider);
    assert_eq!(name, "vc01");
    let dc = &provider["datacenters"][0];
    assert_eq!(dc["name"], json!("DC1"));
    assert_eq!(dc["clusters"][0]["name"], json!("cluster-a"));
    assert_eq!(dc["clusters"][0]["hosts"].as_array().unwrap().len(), 2);

    // both live VMs land, the archived one does not
    let vm_names: Vec<&str> = written[1..]
        .iter()
        .map(|(kind, name, _)| {
            assert_eq!(*kind, SnapshotKind::VirtualMachine);
            name.as_str()
        })
        .collect();
    assert_eq!(vm_names, ["web01", "db01"]);
    assert_eq!(written[1].2["power_state"], json!("on"));
}

#[tokio::test]
async fn datastore_scopes_are_exclusive() {
    let source = lab_inventory();
    let writer = MemoryWriter::default();
    run(&lab_config(), &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap();

    let written = writer.take();
    let provider = &written[0].2;
    let dc = &provider["datacenters"][0];
    let hosts = dc["clusters"][0]["hosts"].as_array().unwrap();

    // local datastore only under its host, shared only under the datacenter
    assert_eq!(hosts[0]["datastores"][0]["name"], json!("local-esx01"));
    assert!(hosts[0]["datastores"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["name"] != json!("san-shared")));
    assert_eq!(hosts[1]["datastores"], json!([]));

    let shared = dc["shared_datastores"].as_array().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["name"], json!("san-shared"));
    assert_eq!(shared[0]["hosts"], json!(["esx01", "esx02"]));
}

#[tokio::test]
async fn vm_document_is_restructured_and_sanitized() {
    let source = lab_inventory();
    let writer = MemoryWriter::default();
    run(&lab_config(), &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap();

    let written = writer.take();
    let vm = &written[1].2;
    let hardware = &vm["hardware"];

    // partitions re-nested under their disk, networks under their NIC
    assert_eq!(
        hardware["disks"][0]["partitions"][0]["name"],
        json!("sda1")
    );
    assert!(hardware.get("partitions").is_none());
    assert_eq!(
        hardware["nics"][0]["networks"][0]["ipaddress"],
        json!("10.0.1.21")
    );
    assert!(hardware.get("networks").is_none());
    assert_eq!(hardware["nics"][0]["lan_name"], json!("VM Network"));

    // sanitization stripped the internal identifier keys
    assert!(hardware["disks"][0].get("id").is_none());
    assert!(hardware["nics"][0].get("lan_id").is_none());
    assert!(vm.get("id").is_none());
    assert!(vm.get("ems_id").is_none());
}

#[tokio::test]
async fn provider_selection_requires_exactly_one_candidate() {
    let mut source = lab_inventory();
    source.collections.get_mut("providers").unwrap().push(json!({
        "id": 2,
        "name": "vc02",
        "type": "Vendor::Infra::Provider",
    }));
    let writer = MemoryWriter::default();

    let err = run(&lab_config(), &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Multiple providers"));
    assert!(writer.take().is_empty());

    // a name disambiguates
    let mut cfg = lab_config();
    cfg.provider_name = Some("vc02".to_string());
    let outcome = run(&cfg, &source, ProtocolEnricher::disabled(), &writer).await;
    // vc02 owns no clusters or VMs but the run itself succeeds
    assert!(outcome.is_ok());

    cfg.provider_name = Some("nope".to_string());
    let err = run(&cfg, &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("'nope' not found"));
}

#[tokio::test]
async fn no_matching_provider_is_fatal() {
    let mut source = lab_inventory();
    source.collections.get_mut("providers").unwrap().clear();
    let writer = MemoryWriter::default();

    let err = run(&lab_config(), &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No matching provider has been found"));
    assert!(writer.take().is_empty());
}

#[tokio::test]
async fn single_vm_scope_narrows_the_second_pass() {
    let source = lab_inventory();
    let writer = MemoryWriter::default();
    let mut cfg = lab_config();
    cfg.vm_name = Some("web01".to_string());

    let summary = run(&cfg, &source, ProtocolEnricher::disabled(), &writer)
        .await
        .unwrap();
    assert_eq!(summary.vms_written, 1);
    let written = writer.take();
    assert_eq!(written.len(), 2);
    assert_eq!(written[1].1, "web01");
}

#[tokio::test]
async fn enrichment_is_strictly_additive() {
    let source = lab_inventory();

    let plain = MemoryWriter::default();
    run(&lab_config(), &source, ProtocolEnricher::disabled(), &plain)
        .await
        .unwrap();
    let plain = plain.take();

    let enriched = MemoryWriter::default();
    let enricher = ProtocolEnricher::new(Box::new(FixtureConnector { refuse: false }));
    run(&lab_config(), &source, enricher, &enriched)
        .await
        .unwrap();
    let enriched = enriched.take();

    let provider = enriched[0].2.as_object().unwrap();
    assert_eq!(provider["product_info"]["full_name"], json!("Fixture Server 8.0.2"));
    assert_eq!(provider["licenses"][0]["name"], json!("Fixture Standard"));
    assert_eq!(
        provider["registered_extensions"][0]["key"],
        json!("com.fixture.nsx")
    );
    // every field of the plain document survives unchanged
    for (key, value) in plain[0].2.as_object().unwrap() {
        assert_eq!(provider.get(key), Some(value), "field '{key}' changed");
    }

    let vm = &enriched[1].2;
    assert_eq!(vm["hardware"]["nics"][0]["adapter_type"], json!("VMXNET3"));
    let plain_vm = plain[1].2.as_object().unwrap();
    for (key, value) in plain_vm {
        if key != "hardware" {
            assert_eq!(enriched[1].2.get(key), Some(value), "field '{key}' changed");
        }
    }
}

#[tokio::test]
async fn unreachable_protocol_endpoint_degrades_to_plain_documents() {
    let source = lab_inventory();
    let writer = MemoryWriter::default();
    let enricher = ProtocolEnricher::new(Box::new(FixtureConnector { refuse: true }));

    let summary = run(&lab_config(), &source, enricher, &writer)
        .await
        .unwrap();
    assert_eq!(summary.providers_written, 1);
    assert_eq!(summary.vms_written, 2);

    let written = writer.take();
    assert!(written[0].2.get("product_info").is_none());
    assert!(written[1].2["hardware"]["nics"][0].get("adapter_type").is_none());
}
