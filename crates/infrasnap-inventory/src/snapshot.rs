//! Snapshot persistence.
//!
//! One self-contained JSON file per top-level entity, named after the
//! entity's display name, under a per-kind subdirectory. Re-running with
//! the same entity overwrites the prior file — the intended idempotent
//! rerun behavior.

use crate::error::{CollectError, CollectResult};
use infrasnap_core::config::OutputFormat;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Which top-level entity a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Provider,
    VirtualMachine,
}

impl SnapshotKind {
    fn subdir(self) -> &'static str {
        match self {
            Self::Provider => "vcs",
            Self::VirtualMachine => "vms",
        }
    }
}

/// Persists one sanitized document per entity.
pub trait SnapshotWriter: Send + Sync {
    fn write(&self, kind: SnapshotKind, name: &str, document: &Value) -> CollectResult<PathBuf>;
}

/// File writer under a base directory, `vcs/` and `vms/` created on
/// demand.
pub struct FileSnapshotWriter {
    base_dir: PathBuf,
    format: OutputFormat,
}

impl FileSnapshotWriter {
    pub fn new(base_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            base_dir: base_dir.into(),
            format,
        }
    }
}

impl SnapshotWriter for FileSnapshotWriter {
    fn write(&self, kind: SnapshotKind, name: &str, document: &Value) -> CollectResult<PathBuf> {
        let dir = self.base_dir.join(kind.subdir());
        fs::create_dir_all(&dir)
            .map_err(|e| CollectError::write(format!("cannot create {}: {e}", dir.display())))?;

        let path = dir.join(format!("{}.json", file_stem(name)));
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string(document),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(document),
        }
        .map_err(|e| CollectError::write(format!("cannot serialize '{name}': {e}")))?;

        fs::write(&path, rendered + "\n")
            .map_err(|e| CollectError::write(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}

/// Display names come from the source unvetted; keep them out of parent
/// directories.
fn file_stem(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
