//! Filesystem layout for generated bindings.
//!
//! Bindings land under `<root>/node_modules/<module>/` so that a submission
//! sitting next to `node_modules` resolves the capability by its bare module
//! name.

use std::path::{Path, PathBuf};

use agentbox_core::Result;

use crate::generator::GeneratedBinding;

/// Write one generated binding under `root/node_modules/<module>/`.
///
/// Returns the module directory. Regeneration overwrites wholesale; there is
/// no incremental diffing because generation is cheap.
pub fn write_binding(root: &Path, binding: &GeneratedBinding) -> Result<PathBuf> {
    let module_dir = root.join("node_modules").join(&binding.module_name);
    std::fs::create_dir_all(&module_dir)?;

    let manifest = serde_json::json!({
        "name": binding.module_name,
        "version": "0.0.0",
        "type": "module",
        "main": "index.ts",
        "types": "index.d.ts",
        "exports": {
            ".": {
                "types": "./index.d.ts",
                "default": "./index.ts"
            }
        }
    });

    std::fs::write(
        module_dir.join("package.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    std::fs::write(module_dir.join("index.ts"), &binding.source)?;
    std::fs::write(module_dir.join("index.d.ts"), &binding.declaration)?;

    tracing::debug!(
        module = %binding.module_name,
        capability = %binding.capability_id,
        "bindings written"
    );
    Ok(module_dir)
}

/// Drop binding modules that no longer correspond to any capability.
pub fn prune_bindings(root: &Path, keep_modules: &[String]) -> Result<()> {
    let node_modules = root.join("node_modules");
    let Ok(entries) = std::fs::read_dir(&node_modules) else {
        return Ok(());
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !keep_modules.contains(&name) {
            tracing::debug!(module = %name, "pruning stale binding");
            let _ = std::fs::remove_dir_all(entry.path());
        }
    }
    Ok(())
}
