//! # infrasnap – Inventory assembly
//!
//! Drives the two hierarchy traversals (provider-rooted and VM-rooted)
//! over an [`InventorySource`](infrasnap_core::source::InventorySource),
//! optionally augments the assembled documents over the management
//! protocol, sanitizes them, and hands them to a snapshot writer.
//!
//! ## Modules
//!
//! - **error** — `CollectError` + subtree degradation policy
//! - **provider** — Provider → datacenters → clusters → hosts traversal
//! - **vm** — VM → hardware → disks / volumes / NICs traversal
//! - **enrich** — Additive protocol enrichment (licenses, extensions, NIC types)
//! - **snapshot** — Snapshot writer trait + per-entity JSON file writer
//! - **run** — Whole-run driver with progress and final attribution

pub(crate) mod doc;
pub mod enrich;
pub mod error;
pub mod provider;
pub mod run;
pub mod snapshot;
pub mod vm;

pub use error::{CollectError, CollectResult};
pub use run::{run, RunSummary};
