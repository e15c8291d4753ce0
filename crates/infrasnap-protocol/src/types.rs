//! Records retrieved over the management protocol, plus wire parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Product identity of the management endpoint ("about" data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub full_name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build: Option<String>,
}

/// One license assignment, with its recursively expanded property map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub name: String,
    pub license_key: String,
    #[serde(default)]
    pub edition_key: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
    /// Key/value properties; a value is either a scalar or, when the
    /// source reports a nested license-info structure, another map.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A serving endpoint registered by an extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionServer {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub server_type: Option<String>,
}

/// A management extension registered with the endpoint (how third-party
/// managers such as network virtualization platforms announce themselves).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub key: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub servers: Vec<ExtensionServer>,
}

/// One virtual ethernet device of a VM, as seen live on the hypervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Device label (e.g. "Network adapter 1") — the matching key against
    /// the REST-sourced NIC record
    pub label: String,
    /// Concrete adapter class (e.g. "VMXNET3", "E1000E")
    pub adapter_type: String,
}

/// Flatten a wire-level property list into a map, recursing whenever a
/// property value is itself a nested license-info structure (an object
/// carrying its own `properties` list). Scalars terminate the recursion.
pub fn license_properties(raw: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(entries) = raw.get("properties").and_then(Value::as_array) else {
        return out;
    };
    for entry in entries {
        let Some(key) = entry.get("key").and_then(Value::as_str) else {
            continue;
        };
        let value = entry.get("value").cloned().unwrap_or(Value::Null);
        if value.get("properties").map(|p| p.is_array()).unwrap_or(false) {
            out.insert(key.to_string(), Value::Object(license_properties(&value)));
        } else {
            out.insert(key.to_string(), value);
        }
    }
    out
}

/// Parse the license-assignment list from its wire form.
pub fn licenses_from_wire(raw: &Value) -> Vec<LicenseRecord> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let assigned = entry.get("assigned_license")?;
            Some(LicenseRecord {
                name: assigned.get("name")?.as_str()?.to_string(),
                license_key: assigned
                    .get("license_key")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                edition_key: assigned
                    .get("edition_key")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                total: assigned.get("total").and_then(Value::as_u64),
                used: assigned.get("used").and_then(Value::as_u64),
                properties: license_properties(entry),
            })
        })
        .collect()
}
