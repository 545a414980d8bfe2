use super::Workspace;
use crate::changelog::{ChangelogReporter, ModuleReport, SinceReport};
use crate::git::history;
use crate::manifest::Manifest;
use anyhow::{Context, Result};
use std::path::Path;

fn reporter(workspace: &Workspace) -> ChangelogReporter {
    ChangelogReporter::new(workspace.config().changelog.file.clone())
}

/// Commits since the date of `reference` (a commit of the project itself),
/// for the project and every module of manifest `source`.
pub fn changelog(workspace: &Workspace, source: &str, reference: &str) -> Result<SinceReport> {
    let registry = workspace.load(source)?;
    reporter(workspace)
        .since(reference, &registry)
        .with_context(|| format!("You must specify a valid reference, '{reference}' is not one"))
}

/// Compare manifest `source` against the same manifest as committed at
/// `old_version` in the project repository.
pub fn changelog2(workspace: &Workspace, source: &str, old_version: &str) -> Result<Vec<ModuleReport>> {
    let name = workspace.config().manifest_name(source);
    let text = history::show_file(workspace.basedir(), old_version, Path::new(&name))
        .with_context(|| format!("Could not retrieve {name} from {old_version}"))?;
    let previous = Manifest::parse(&text, Path::new(&format!("{old_version}:{name}")))?;

    let registry = workspace.load(source)?;
    Ok(reporter(workspace).compare(&previous, &registry))
}
