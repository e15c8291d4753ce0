//! Collection driver: one provider snapshot, then one snapshot per VM.

use crate::enrich::ProtocolEnricher;
use crate::error::CollectResult;
use crate::provider::ProviderCollector;
use crate::snapshot::{SnapshotKind, SnapshotWriter};
use crate::vm::VmCollector;
use infrasnap_core::config::RunConfig;
use infrasnap_core::sanitize::sanitize;
use infrasnap_core::source::InventorySource;
use serde_json::Value;

/// What a run produced, and which entities it had to leave behind.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub providers_written: usize,
    pub vms_written: usize,
    /// (entity label, reason) for entities whose snapshot never landed.
    pub failed: Vec<(String, String)>,
}

/// Collect, enrich, sanitize and persist the full snapshot set.
///
/// Provider selection, schema resolution and the root provider fetch are
/// fatal. Everything downstream of a committed root degrades per entity:
/// a broken VM is recorded in the summary and the run moves on.
pub async fn run(
    cfg: &RunConfig,
    source: &dyn InventorySource,
    mut enricher: ProtocolEnricher,
    writer: &dyn SnapshotWriter,
) -> CollectResult<RunSummary> {
    let mut summary = RunSummary::default();

    let providers = ProviderCollector::new(source);
    let provider_id = providers
        .select_provider(cfg.provider_type.as_deref(), cfg.provider_name.as_deref())
        .await?;
    tracing::info!("collecting provider {provider_id}");

    let mut provider_doc = providers.collect(&provider_id).await?;
    enricher.enrich_provider(&mut provider_doc).await;
    sanitize(&mut provider_doc);

    let provider_name = display_name(&provider_doc, "provider");
    match writer.write(SnapshotKind::Provider, &provider_name, &provider_doc) {
        Ok(path) => {
            tracing::info!("wrote {}", path.display());
            summary.providers_written += 1;
        }
        Err(e) => summary.failed.push((provider_name.clone(), e.to_string())),
    }

    let vms = VmCollector::new(source);
    let attributes = vms.vm_attributes().await?;
    let vm_ids = vms.vm_ids(&provider_id, cfg.vm_name.as_deref()).await?;
    let total = vm_ids.len();

    for (i, vm_id) in vm_ids.iter().enumerate() {
        match vms.collect(vm_id, &attributes).await {
            Ok(Some(mut doc)) => {
                enricher.enrich_vm(&mut doc).await;
                sanitize(&mut doc);
                let name = display_name(&doc, vm_id);
                match writer.write(SnapshotKind::VirtualMachine, &name, &doc) {
                    Ok(_) => summary.vms_written += 1,
                    Err(e) => summary.failed.push((name, e.to_string())),
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("VM {vm_id} failed: {e}");
                summary.failed.push((format!("vm {vm_id}"), e.to_string()));
            }
        }
        tracing::info!("{} of {} VMs analyzed", i + 1, total);
    }

    Ok(summary)
}

fn display_name(doc: &Value, fallback: &str) -> String {
    doc.get("name")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}
