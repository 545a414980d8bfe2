use super::{git, output};
use crate::registry::Status;
use crate::registry::discovery::is_repository;
use crate::shared::glob::build_exclusion_set;
use anyhow::Result;
use globset::GlobSet;
use std::path::Path;
use std::process::Command;

/// Decides whether a module's working tree may be overwritten.
///
/// Checks run in order and the first hit wins: unstaged changes, staged but
/// uncommitted changes, then untracked files outside the exclusion list.
#[derive(Debug, Clone)]
pub struct RepoStateClassifier {
    exclusions: GlobSet,
}

enum Check {
    Clean,
    Hit,
    Failed(String),
}

impl RepoStateClassifier {
    pub fn new(exclusions: &[String]) -> Result<Self> {
        Ok(Self {
            exclusions: build_exclusion_set(exclusions)?,
        })
    }

    pub fn classify(&self, path: &Path) -> Status {
        if !is_repository(path) {
            return classify_plain_dir(path);
        }

        match output(git(path).args(["update-index", "-q", "--ignore-submodules", "--refresh"])) {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                tracing::warn!(
                    "Could not refresh index in {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                return Status::Error("could not refresh index".to_string());
            }
            Err(e) => {
                tracing::warn!("Could not refresh index in {}: {}", path.display(), e);
                return Status::Error("could not refresh index".to_string());
            }
        }

        match check(git(path).args(["diff-files", "--quiet", "--ignore-submodules", "--"])) {
            Check::Hit => return Status::Dirty("unstaged changes".to_string()),
            Check::Failed(reason) => return Status::Error(reason),
            Check::Clean => {}
        }

        // An unborn HEAD has nothing to compare the index against
        let has_head = output(git(path).args(["rev-parse", "--verify", "--quiet", "HEAD"]))
            .map(|o| o.status.success())
            .unwrap_or(false);
        if has_head {
            match check(git(path).args([
                "diff-index",
                "--cached",
                "--quiet",
                "HEAD",
                "--ignore-submodules",
                "--",
            ])) {
                Check::Hit => return Status::Dirty("uncommitted changes".to_string()),
                Check::Failed(reason) => return Status::Error(reason),
                Check::Clean => {}
            }
        }

        match self.untracked(path) {
            Ok(true) => Status::Dirty("untracked files".to_string()),
            Ok(false) => Status::Known,
            Err(e) => Status::Error(format!("could not list untracked files: {e}")),
        }
    }

    fn untracked(&self, path: &Path) -> Result<bool> {
        let listing = super::run(git(path).args(["ls-files", "-o", "-d", "--exclude-standard"]))?;
        Ok(listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|file| !self.is_excluded(file)))
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        self.exclusions.is_match(relative)
    }
}

/// Exit status 1 means the comparison found differences; anything else
/// non-zero means git could not answer.
fn check(cmd: &mut Command) -> Check {
    match output(cmd) {
        Ok(out) if out.status.success() => Check::Clean,
        Ok(out) if out.status.code() == Some(1) => Check::Hit,
        Ok(out) => Check::Failed(String::from_utf8_lossy(&out.stderr).trim().to_string()),
        Err(e) => Check::Failed(e.to_string()),
    }
}

fn classify_plain_dir(path: &Path) -> Status {
    match std::fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                Status::Dirty("untracked files".to_string())
            } else {
                Status::Known
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Status::Known,
        Err(e) => Status::Error(e.to_string()),
    }
}
