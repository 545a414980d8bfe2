use super::cache::GitCache;
use super::{git, output, run};
use crate::registry::discovery::is_repository;
use crate::vcs::{CacheHandle, RepoHandle, SyncState};
use anyhow::{Context, Result, anyhow};
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A module checkout whose objects are borrowed from its [`GitCache`].
#[derive(Debug)]
pub struct GitRepo {
    path: PathBuf,
    remote: String,
    cache: Arc<GitCache>,
}

impl GitRepo {
    pub fn new(path: &Path, remote: &str, cache: Arc<GitCache>) -> Self {
        Self {
            path: path.to_path_buf(),
            remote: remote.to_string(),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Option<Repository>> {
        if !is_repository(&self.path) {
            return Ok(None);
        }
        Repository::open(&self.path)
            .map(Some)
            .with_context(|| format!("Failed to open Git repository at {}", self.path.display()))
    }

    fn is_absent(&self) -> bool {
        match std::fs::read_dir(&self.path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => !self.path.exists(),
        }
    }

    fn has_tracked_changes(&self) -> Result<bool> {
        let status = run(git(&self.path).args(["status", "--porcelain", "--untracked-files=no"]))?;
        Ok(!status.trim().is_empty())
    }

    fn resolve(&self, desired_ref: &str) -> Result<String> {
        self.cache.resolve(desired_ref).ok_or_else(|| {
            anyhow!("Reference '{}' not found in cache for {}", desired_ref, self.remote)
        })
    }

    /// Fresh checkout sharing objects with the cache, origin pointing at the
    /// declared source.
    fn clone_from_cache(&self, commit: &str) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_dir_all(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        run(git(parent)
            .args(["clone", "--quiet", "--no-checkout", "--shared"])
            .arg(self.cache.path())
            .arg(&self.path))
        .with_context(|| format!("Failed to clone {} from cache", self.remote))?;

        run(git(&self.path).args(["remote", "set-url", "origin", &self.remote]))?;
        self.checkout(commit)
    }

    fn checkout(&self, commit: &str) -> Result<()> {
        let present = output(git(&self.path).args(["cat-file", "-e", &format!("{commit}^{{commit}}")]))?
            .status
            .success();

        if !present {
            tracing::debug!("Fetching {} from cache into {}", commit, self.path.display());
            run(git(&self.path)
                .args(["fetch", "--quiet", "--tags"])
                .arg(self.cache.path())
                .arg("+refs/heads/*:refs/remotes/cache/*"))
            .with_context(|| format!("Failed to fetch from cache into {}", self.path.display()))?;
        }

        run(git(&self.path).args(["checkout", "--quiet", "--force", commit]))
            .with_context(|| format!("Could not checkout {} in {}", commit, self.path.display()))?;

        tracing::info!("Checked out {} at {}", self.path.display(), commit);
        Ok(())
    }
}

impl RepoHandle for GitRepo {
    fn head(&self) -> Result<Option<String>> {
        let Some(repo) = self.open()? else {
            return Ok(None);
        };

        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => return Ok(None),
            Err(e) => return Err(e).context("Failed to get HEAD reference"),
        };

        let commit = head.peel_to_commit().context("HEAD does not point at a commit")?;
        Ok(Some(commit.id().to_string()))
    }

    fn origin(&self) -> Result<Option<String>> {
        let Some(repo) = self.open()? else {
            return Ok(None);
        };

        match repo.find_remote("origin") {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read origin remote"),
        }
    }

    fn sync_state(&self, desired_ref: &str) -> Result<SyncState> {
        if self.is_absent() {
            return Ok(SyncState::Absent);
        }
        if !is_repository(&self.path) {
            return Ok(SyncState::Mismatched);
        }
        if self.origin()?.as_deref() != Some(self.remote.as_str()) {
            return Ok(SyncState::Mismatched);
        }
        if self.has_tracked_changes()? {
            return Ok(SyncState::Dirty);
        }

        let head = self.head()?;
        match self.cache.resolve(desired_ref) {
            Some(commit) if head.as_deref() == Some(commit.as_str()) => {
                // A branch may have moved upstream since the cache was last fetched
                if self.cache.is_branch(desired_ref) && !self.cache.is_fresh() {
                    Ok(SyncState::Outdated)
                } else {
                    Ok(SyncState::InSync)
                }
            }
            _ => Ok(SyncState::Outdated),
        }
    }

    fn sync(&self, desired_ref: &str) -> Result<()> {
        match self.sync_state(desired_ref)? {
            SyncState::Absent | SyncState::Mismatched => {
                let commit = self.resolve(desired_ref)?;
                self.clone_from_cache(&commit)
            }
            SyncState::Outdated => {
                let commit = self.resolve(desired_ref)?;
                self.checkout(&commit)
            }
            SyncState::InSync => Ok(()),
            SyncState::Dirty => Err(anyhow!(
                "{} has local modifications, refusing to check out {}",
                self.path.display(),
                desired_ref
            )),
        }
    }
}
