use super::Workspace;
use crate::sync::{SyncDriver, SyncIssue};
use anyhow::Result;

/// Bring every clean module of manifest `method` to its desired reference.
///
/// Load and classification failures abort before anything is touched.
/// Modules that could not be synchronized come back as issues.
pub fn checkout(workspace: &Workspace, method: &str) -> Result<Vec<SyncIssue>> {
    checkout_with_progress(workspace, method, None::<fn(usize, usize, usize)>)
}

pub fn checkout_with_progress<P>(workspace: &Workspace, method: &str, progress: Option<P>) -> Result<Vec<SyncIssue>>
where
    P: Fn(usize, usize, usize) + Sync,
{
    let mut registry = workspace.load(method)?;
    for name in registry.unknown_modules() {
        tracing::info!("Leaving undeclared repository {} alone", name);
    }

    SyncDriver::new(workspace.strategy()).checkout_with_progress(&mut registry, progress)
}
