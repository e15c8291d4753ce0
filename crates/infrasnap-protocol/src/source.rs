//! Capability traits for the management-protocol data source.
//!
//! The enricher works against these traits; `session::ProtocolClient` is
//! the live implementation and tests plug in fixtures.

use crate::error::ProtocolResult;
use crate::types::{AdapterInfo, ExtensionRecord, LicenseRecord, ServiceInfo};
use async_trait::async_trait;

/// An open, credentialed session to a hypervisor management endpoint.
#[async_trait]
pub trait ProtocolSource: Send + Sync {
    /// Product name / version of the management service.
    async fn service_info(&self) -> ProtocolResult<ServiceInfo>;

    /// License assignment records, property maps fully expanded.
    async fn assigned_licenses(&self) -> ProtocolResult<Vec<LicenseRecord>>;

    /// Extensions registered with the endpoint.
    async fn registered_extensions(&self) -> ProtocolResult<Vec<ExtensionRecord>>;

    /// Live virtual ethernet devices of the named VM.
    async fn ethernet_adapters(&self, vm_name: &str) -> ProtocolResult<Vec<AdapterInfo>>;
}

/// Opens [`ProtocolSource`] sessions on demand — the enricher only learns
/// the endpoint's address from the traversed provider document.
#[async_trait]
pub trait ProtocolConnector: Send + Sync {
    async fn open(&self, host: &str) -> ProtocolResult<Box<dyn ProtocolSource>>;
}
