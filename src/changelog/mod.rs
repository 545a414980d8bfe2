//! Changelog reports
//!
//! Two views of what changed in the modules of a project:
//!
//! - [`ChangelogReporter::compare`] diffs the current registry against a
//!   manifest from an earlier release, module by module;
//! - [`ChangelogReporter::since`] collects every commit made after the date
//!   of a reference commit, for the project itself and for each module.
//!
//! Module histories are independent, so both fan out over rayon.

use crate::git::history;
use crate::manifest::Manifest;
use crate::registry::{Module, Registry};
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Key under which the top-level project's own history is reported.
pub const PROJECT_KEY: &str = "__project__";

const NO_PREVIOUS: &str = "No Previous Module Data";

/// What happened to one module between two releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleChange {
    /// Same reference in both manifests
    NoChanges,
    /// Reference moved: changelog lines added since, plus the commit log
    Changed { changelog: Option<String>, log: String },
    /// Not in the previous manifest; the full current changelog
    NewModule { changelog: Option<String> },
    /// Nothing on disk to inspect
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub current_ref: String,
    pub previous_ref: Option<String>,
    pub change: ModuleChange,
}

/// Commits since a reference date, keyed by module name (or [`PROJECT_KEY`]).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SinceReport {
    pub reference: String,
    pub since: String,
    pub logs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ChangelogReporter {
    changelog_file: PathBuf,
}

impl ChangelogReporter {
    pub fn new(changelog_file: impl Into<PathBuf>) -> Self {
        Self {
            changelog_file: changelog_file.into(),
        }
    }

    /// Compare every declared module of `current` against `previous`.
    /// Reports are sorted by module name.
    pub fn compare(&self, previous: &Manifest, current: &Registry) -> Vec<ModuleReport> {
        let previous_refs: HashMap<&str, &str> = previous
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.desired_ref.as_str()))
            .collect();

        let modules: Vec<&Module> = current.declared().collect();
        let mut reports: Vec<ModuleReport> = modules
            .par_iter()
            .map(|module| self.compare_module(module, previous_refs.get(module.name.as_str()).copied()))
            .collect();

        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    fn compare_module(&self, module: &Module, previous_ref: Option<&str>) -> ModuleReport {
        let current_ref = module.desired_ref.clone().unwrap_or_default();
        let mut report = ModuleReport {
            name: module.name.clone(),
            current_ref: current_ref.clone(),
            previous_ref: None,
            change: ModuleChange::NoData,
        };

        if !module.path.is_dir() {
            return report;
        }

        report.change = match previous_ref {
            None => ModuleChange::NewModule {
                changelog: self.read_changelog(&module.path),
            },
            Some(old) if old == current_ref => ModuleChange::NoChanges,
            Some(old) => {
                report.previous_ref = Some(old.to_string());
                self.changes_between(&module.path, old, &current_ref)
            }
        };
        report
    }

    fn changes_between(&self, path: &Path, old: &str, new: &str) -> ModuleChange {
        let from = history::resolve_rev(path, old).unwrap_or_else(|| old.to_string());
        let to = history::resolve_rev(path, new).unwrap_or_else(|| new.to_string());

        let changelog = if path.join(&self.changelog_file).is_file() {
            history::added_lines(path, &from, &self.changelog_file)
                .inspect_err(|e| tracing::warn!("Could not diff changelog in {}: {:#}", path.display(), e))
                .ok()
        } else {
            None
        };

        let log = history::log_range(path, &from, &to).unwrap_or_else(|e| {
            tracing::warn!("Could not read history of {}: {:#}", path.display(), e);
            String::new()
        });

        ModuleChange::Changed { changelog, log }
    }

    fn read_changelog(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path.join(&self.changelog_file)).ok()
    }

    /// Commits made since `reference` (a commit in the top-level project),
    /// for the project and every repository in the module directories,
    /// undeclared ones included. Empty logs are left out.
    pub fn since(&self, reference: &str, registry: &Registry) -> Result<SinceReport> {
        let since = history::commit_date(registry.basedir(), reference)?;
        tracing::debug!("Collecting history since {} ({})", since, reference);

        let mut targets: Vec<(String, PathBuf)> = vec![(PROJECT_KEY.to_string(), registry.basedir().to_path_buf())];
        targets.extend(
            registry
                .modules()
                .iter()
                .filter(|m| m.path.is_dir())
                .map(|m| (m.name.clone(), m.path.clone())),
        );

        let logs = targets
            .par_iter()
            .filter_map(|(name, path)| match history::log_since(path, &since) {
                Ok(log) if !log.trim().is_empty() => Some((name.clone(), log)),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Could not read history of {}: {:#}", path.display(), e);
                    None
                }
            })
            .collect();

        Ok(SinceReport {
            reference: reference.to_string(),
            since,
            logs,
        })
    }
}

/// One row of the version summary: `(module, current, previous)`.
pub fn version_table(reports: &[ModuleReport]) -> Vec<(String, String, String)> {
    reports
        .iter()
        .map(|r| {
            (
                r.name.clone(),
                r.current_ref.clone(),
                r.previous_ref.clone().unwrap_or_else(|| NO_PREVIOUS.to_string()),
            )
        })
        .collect()
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text form of a comparison, followed by the version summary.
pub fn render_comparison(reports: &[ModuleReport]) -> String {
    let mut out = String::new();

    for report in reports {
        let (changelog, log) = match &report.change {
            ModuleChange::NoChanges => ("No Module Changes".to_string(), "No Module Changes".to_string()),
            ModuleChange::Changed { changelog, log } => (
                changelog.clone().unwrap_or_else(|| "No CHANGELOG".to_string()),
                log.clone(),
            ),
            ModuleChange::NewModule { changelog } => (
                changelog.clone().unwrap_or_else(|| "No CHANGELOG".to_string()),
                "Module did not exist in the previous version".to_string(),
            ),
            ModuleChange::NoData => ("No DATA".to_string(), "No DATA".to_string()),
        };

        let _ = writeln!(out, "========\n{}:\n", report.name);
        let _ = writeln!(out, "Current  Version: {}", report.current_ref);
        let _ = writeln!(
            out,
            "Previous Version: {}",
            report.previous_ref.as_deref().unwrap_or(NO_PREVIOUS)
        );
        let _ = writeln!(out, "-----------\nCHANGELOG\n\n{}\n", indent(&changelog));
        let _ = writeln!(out, "-----------\nGIT LOG\n{}\n-----------", indent(&log));
    }

    let rule = "=".repeat(85);
    let _ = writeln!(out, "{rule}\nList of Versions\n----------------");
    let _ = writeln!(out, "Module Name, Current Version, Previous Version");
    for (name, current, previous) in version_table(reports) {
        let _ = writeln!(out, "{name},{current},{previous}");
    }
    let _ = writeln!(out, "{rule}");

    out
}

/// Text form of a since-report.
pub fn render_since(report: &SinceReport) -> String {
    if report.logs.is_empty() {
        return format!("No changes found for any components since {}\n", report.since);
    }

    let mut out = String::new();
    for (name, log) in &report.logs {
        let _ = writeln!(out, "========\n{name}:\n\n{}\n", indent(log));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::fake::FakeBackend;
    use std::fs;
    use tempfile::TempDir;

    fn registry(temp: &TempDir) -> Registry {
        let path = temp.path().join("Puppetfile.tracking");
        fs::write(
            &path,
            "mod 'simp-same', :git => 'u1', :ref => 'v1'\n\
             mod 'simp-fresh', :git => 'u2', :ref => 'main'\n\
             mod 'simp-gone', :git => 'u3', :ref => 'main'\n",
        )
        .unwrap();
        Registry::load(&path, &FakeBackend::default()).unwrap()
    }

    #[test]
    fn test_compare_classifies_modules() {
        let temp = TempDir::new().unwrap();
        let modules = temp.path().join("modules");
        fs::create_dir_all(modules.join("same")).unwrap();
        fs::create_dir_all(modules.join("fresh")).unwrap();
        fs::write(modules.join("fresh/CHANGELOG"), "* 0.1.0 first\n").unwrap();

        let previous = Manifest::parse(
            "mod 'simp-same', :git => 'u1', :ref => 'v1'\nmod 'simp-gone', :git => 'u3', :ref => 'old'\n",
            Path::new("Puppetfile.tracking"),
        )
        .unwrap();

        let reports = ChangelogReporter::new("CHANGELOG").compare(&previous, &registry(&temp));
        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["fresh", "gone", "same"]);

        assert_eq!(
            reports[0].change,
            ModuleChange::NewModule {
                changelog: Some("* 0.1.0 first\n".to_string())
            }
        );
        assert_eq!(reports[1].change, ModuleChange::NoData);
        assert_eq!(reports[2].change, ModuleChange::NoChanges);
    }

    #[test]
    fn test_version_table() {
        let reports = vec![
            ModuleReport {
                name: "a".to_string(),
                current_ref: "v2".to_string(),
                previous_ref: Some("v1".to_string()),
                change: ModuleChange::Changed {
                    changelog: None,
                    log: String::new(),
                },
            },
            ModuleReport {
                name: "b".to_string(),
                current_ref: "main".to_string(),
                previous_ref: None,
                change: ModuleChange::NewModule { changelog: None },
            },
        ];

        assert_eq!(
            version_table(&reports),
            [
                ("a".to_string(), "v2".to_string(), "v1".to_string()),
                ("b".to_string(), "main".to_string(), NO_PREVIOUS.to_string()),
            ]
        );

        let text = render_comparison(&reports);
        assert!(text.contains("Previous Version: v1"));
        assert!(text.contains("  No CHANGELOG"));
        assert!(text.contains("b,main,No Previous Module Data"));
    }

    #[test]
    fn test_render_since() {
        let mut report = SinceReport {
            since: "2024-01-01 00:00:00 +0000".to_string(),
            ..Default::default()
        };
        assert_eq!(
            render_since(&report),
            "No changes found for any components since 2024-01-01 00:00:00 +0000\n"
        );

        report.logs.insert("foo".to_string(), "commit abc\n\n    fix".to_string());
        assert_eq!(render_since(&report), "========\nfoo:\n\n  commit abc\n  \n      fix\n\n");
    }
}
