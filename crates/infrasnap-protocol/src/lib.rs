//! # infrasnap – Management-protocol client
//!
//! Optional secondary data source: a live, credentialed session directly to
//! a hypervisor management endpoint, used to attach protocol-only data
//! (license assignments, registered extensions, adapter classification) to
//! entities the REST traversal already produced.
//!
//! ## Modules
//!
//! - **types** — License / extension / adapter records and wire parsing
//! - **error** — Crate-specific error types
//! - **source** — `ProtocolSource` / `ProtocolConnector` capability traits
//! - **session** — Session-based HTTP client implementing the traits

pub mod error;
pub mod session;
pub mod source;
pub mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use session::{ProtocolClient, SessionConnector};
pub use source::{ProtocolConnector, ProtocolSource};
pub use types::{AdapterInfo, ExtensionRecord, ExtensionServer, LicenseRecord, ServiceInfo};
