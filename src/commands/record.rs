use super::Workspace;
use crate::manifest;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Pin the modules of manifest `reference` to their checked-out commits and
/// write the result as manifest `method`. Returns the written path.
pub fn record(workspace: &Workspace, method: &str, reference: &str) -> Result<PathBuf> {
    let registry = workspace.load(reference)?;
    let text = manifest::render(&registry);

    let target = workspace.manifest_path(method);
    std::fs::write(&target, text).with_context(|| format!("Failed to write {}", target.display()))?;

    tracing::info!(
        "Recorded {} modules from {} into {}",
        registry.declared().count(),
        reference,
        target.display()
    );
    Ok(target)
}
