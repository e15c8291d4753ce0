//! Session-based HTTP client for the hypervisor management endpoint.
//!
//! Connects by hostname or address with username/password (insecure TLS
//! allowed for self-signed labs), creates an API session, and serves the
//! introspection reads the enricher needs. Logout is best-effort.

use crate::error::{ProtocolError, ProtocolResult};
use crate::source::{ProtocolConnector, ProtocolSource};
use crate::types::{
    licenses_from_wire, AdapterInfo, ExtensionRecord, LicenseRecord, ServiceInfo,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

const SESSION_HEADER: &str = "api-session-id";

/// Live management-protocol session.
pub struct ProtocolClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl ProtocolClient {
    /// Open a session against `https://{host}/api`.
    pub async fn connect(
        host: &str,
        username: &str,
        password: &str,
        insecure: bool,
        timeout_secs: u64,
    ) -> ProtocolResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProtocolError::connection(format!("Failed to build HTTP client: {e}")))?;

        let base_url = format!("https://{host}/api");
        let resp = client
            .post(format!("{base_url}/session"))
            .basic_auth(username, Some(password))
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::auth(format!(
                "credentials rejected by {host}"
            )));
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProtocolError::api(
                status.as_u16(),
                format!("session create failed: {body}"),
            ));
        }

        // Session id comes back as a bare JSON string.
        let session_id: String = resp
            .json()
            .await
            .map_err(|e| ProtocolError::parse(format!("bad session response: {e}")))?;

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    /// Delete the session; errors are ignored.
    pub async fn close(self) {
        let _ = self
            .client
            .delete(format!("{}/session", self.base_url))
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await;
    }

    async fn get_json(&self, path: &str) -> ProtocolResult<Value> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProtocolError::api(
                status.as_u16(),
                format!("GET {path} failed: {body}"),
            ));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ProtocolError::parse(format!("GET {path}: {e}")))
    }
}

#[async_trait]
impl ProtocolSource for ProtocolClient {
    async fn service_info(&self) -> ProtocolResult<ServiceInfo> {
        let raw = self.get_json("/content/about").await?;
        serde_json::from_value(raw).map_err(Into::into)
    }

    async fn assigned_licenses(&self) -> ProtocolResult<Vec<LicenseRecord>> {
        let raw = self.get_json("/content/license-assignments").await?;
        Ok(licenses_from_wire(&raw))
    }

    async fn registered_extensions(&self) -> ProtocolResult<Vec<ExtensionRecord>> {
        let raw = self.get_json("/content/extensions").await?;
        serde_json::from_value(raw).map_err(Into::into)
    }

    async fn ethernet_adapters(&self, vm_name: &str) -> ProtocolResult<Vec<AdapterInfo>> {
        // Resolve the VM's protocol-side identifier by name first; the
        // device list only hangs off the full VM record.
        let listing = self.get_json(&vm_lookup_path(vm_name)).await?;
        let vm_id = listing
            .as_array()
            .and_then(|vms| vms.first())
            .and_then(|vm| vm.get("vm"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProtocolError::parse(format!("VM '{vm_name}' not found on the endpoint"))
            })?
            .to_string();

        let record = self.get_json(&format!("/vcenter/vm/{vm_id}")).await?;
        Ok(adapters_from_record(&record))
    }
}

/// Name-filtered VM listing path. VM display names are arbitrary text,
/// so the filter value is form-encoded.
fn vm_lookup_path(vm_name: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("names", vm_name)
        .finish();
    format!("/vcenter/vm?{query}")
}

/// Pull label + adapter class out of a VM record's NIC device map.
fn adapters_from_record(record: &Value) -> Vec<AdapterInfo> {
    let Some(nics) = record.get("nics").and_then(Value::as_object) else {
        return Vec::new();
    };
    nics.values()
        .filter_map(|nic| {
            Some(AdapterInfo {
                label: nic.get("label")?.as_str()?.to_string(),
                adapter_type: nic
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
            })
        })
        .collect()
}

/// Factory handed to the enricher: opens one session per endpoint address.
pub struct SessionConnector {
    username: String,
    password: String,
    insecure: bool,
    timeout_secs: u64,
}

impl SessionConnector {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
        timeout_secs: u64,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            insecure,
            timeout_secs,
        }
    }
}

#[async_trait]
impl ProtocolConnector for SessionConnector {
    async fn open(&self, host: &str) -> ProtocolResult<Box<dyn ProtocolSource>> {
        let client = ProtocolClient::connect(
            host,
            &self.username,
            &self.password,
            self.insecure,
            self.timeout_secs,
        )
        .await?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adapters_read_label_and_type_from_the_device_map() {
        let record = json!({
            "nics": {
                "4000": {"label": "Network adapter 1", "type": "VMXNET3", "mac": "00:50:56:aa:bb:cc"},
                "4001": {"label": "Network adapter 2", "type": "E1000E"}
            }
        });
        let mut adapters = adapters_from_record(&record);
        adapters.sort_by(|a, b| a.label.cmp(&b.label));
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].label, "Network adapter 1");
        assert_eq!(adapters[0].adapter_type, "VMXNET3");
    }

    #[test]
    fn record_without_nics_yields_no_adapters() {
        assert!(adapters_from_record(&json!({})).is_empty());
        assert!(adapters_from_record(&json!({"nics": []})).is_empty());
    }

    #[test]
    fn vm_lookup_encodes_the_display_name() {
        assert_eq!(vm_lookup_path("web01"), "/vcenter/vm?names=web01");
        assert_eq!(
            vm_lookup_path("db 01 & replica"),
            "/vcenter/vm?names=db+01+%26+replica"
        );
    }
}
