use super::Workspace;
use crate::registry::Status;
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedModule {
    pub name: String,
    /// Path relative to the project directory
    pub path: PathBuf,
    pub status: Status,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Modules whose status is anything but Known, undeclared ones included
    pub changed: Vec<ChangedModule>,
    /// Undeclared repositories found on disk
    pub unknown: Vec<String>,
    /// Module paths occupied by something other than a directory
    pub warnings: Vec<String>,
}

impl StatusReport {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Report which modules of manifest `method` carry local changes.
pub fn status(workspace: &Workspace, method: &str) -> Result<StatusReport> {
    let registry = workspace.load(method)?;
    let mut report = StatusReport::default();

    for module in registry.modules() {
        if !module.path.is_dir() {
            if module.path.exists() {
                report
                    .warnings
                    .push(format!("'{}' is not a module...skipping", module.path.display()));
            }
            continue;
        }

        if !module.status.is_known() {
            report.changed.push(ChangedModule {
                name: module.name.clone(),
                path: registry.relative(&module.path).to_path_buf(),
                status: module.status.clone(),
            });
        }
    }

    report.unknown = registry.unknown_modules().into_iter().map(String::from).collect();
    Ok(report)
}
