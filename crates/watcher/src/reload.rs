//! The reload pass: resync capabilities, regenerate bindings, persist status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentbox_bindgen::{generate, writer, BindingSpec};
use agentbox_controller::Controller;
use agentbox_core::traits::CapabilityRegistry;
use agentbox_core::Result;

/// Everything a reload pass needs, owned by the session and shared with the
/// watcher task.
#[derive(Clone)]
pub struct ReloadContext {
    pub controller: Arc<Controller>,
    pub registry: Arc<dyn CapabilityRegistry>,
    /// Root of the sandbox working area bindings are written into.
    pub bindings_root: PathBuf,
    /// Port baked into regenerated binding sources.
    pub relay_port: u16,
}

/// Run one full reload pass.
///
/// Resolves the desired capability set, reconciles the controller against it
/// (unchanged capabilities keep their running supervisors), then regenerates
/// every binding wholesale.
pub async fn reload(ctx: &ReloadContext) -> Result<()> {
    let desired = ctx.registry.resolve().await?;
    let report = ctx.controller.sync_capabilities(&desired).await;

    tracing::info!(
        spawned = report.spawned.len(),
        stopped = report.stopped.len(),
        kept = report.kept.len(),
        "hot reload applied"
    );

    regenerate_bindings(&ctx.controller, ctx.relay_port, &ctx.bindings_root).await?;
    Ok(())
}

/// Regenerate bindings for every connected capability.
///
/// Regeneration is wholesale: each module is rewritten and modules without a
/// backing capability are pruned. Returns how many modules were written.
pub async fn regenerate_bindings(
    controller: &Controller,
    relay_port: u16,
    bindings_root: &Path,
) -> Result<usize> {
    let catalogs = controller.catalogs().await;
    let mut kept_modules = Vec::with_capacity(catalogs.len());

    for (descriptor, tools) in &catalogs {
        let binding = generate(&BindingSpec {
            capability_id: &descriptor.id,
            module_name: &descriptor.module,
            relay_port,
            tools,
        });
        writer::write_binding(bindings_root, &binding)?;
        kept_modules.push(descriptor.module.clone());
    }

    writer::prune_bindings(bindings_root, &kept_modules)?;

    tracing::info!(modules = kept_modules.len(), "bindings regenerated");
    Ok(kept_modules.len())
}
