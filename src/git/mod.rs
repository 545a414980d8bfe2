//! Git integration layer
//!
//! Implements the [`vcs`](crate::vcs) contracts with the system git client.
//! Read-only metadata (head, origin, history lookups) goes through `git2`;
//! anything that mutates a checkout or inspects the index shells out to
//! `git`, always scoped with `current_dir` so the process working directory
//! is never touched.

pub mod cache;
pub mod classify;
pub mod history;
pub mod repo;

use crate::config::DepsConfig;
use crate::registry::Status;
use crate::vcs::{Backend, RepoHandle};
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, LazyLock};

pub use cache::GitCache;
pub use classify::RepoStateClassifier;
pub use repo::GitRepo;

static GIT_BINARY: LazyLock<PathBuf> =
    LazyLock::new(|| which::which("git").unwrap_or_else(|_| PathBuf::from("git")));

/// A `git` command running in `dir`, isolated from any repository the
/// calling process happens to be inside of.
pub fn git(dir: &Path) -> Command {
    let mut cmd = Command::new(GIT_BINARY.as_path());
    cmd.current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .env_remove("GIT_INDEX_FILE");
    cmd
}

/// Run `cmd`, failing with its stderr unless it exits successfully.
pub fn run(cmd: &mut Command) -> Result<String> {
    let output = output(cmd)?;
    if !output.status.success() {
        return Err(anyhow!(
            "Git command failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8(output.stdout).context("Git output is not valid UTF-8")
}

/// Run `cmd` and hand back the raw output regardless of exit status.
pub fn output(cmd: &mut Command) -> Result<Output> {
    cmd.output()
        .with_context(|| format!("Failed to execute {:?}", cmd))
}

/// Handles backed by real git checkouts.
#[derive(Debug, Clone)]
pub struct GitBackend {
    cache_root: PathBuf,
    classifier: RepoStateClassifier,
}

impl GitBackend {
    pub fn new(cache_root: PathBuf, classifier: RepoStateClassifier) -> Self {
        Self {
            cache_root,
            classifier,
        }
    }

    /// Backend for a project rooted at `basedir`.
    pub fn from_config(basedir: &Path, config: &DepsConfig) -> Result<Self> {
        let classifier = RepoStateClassifier::new(&config.classify.exclude)?;
        Ok(Self::new(basedir.join(&config.cache.root), classifier))
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }
}

impl Backend for GitBackend {
    type Cache = GitCache;

    fn cache(&self, remote: &str) -> Arc<GitCache> {
        Arc::new(GitCache::new(&self.cache_root, remote))
    }

    fn repo(&self, path: &Path, remote: &str, cache: Arc<GitCache>) -> Arc<dyn RepoHandle> {
        Arc::new(GitRepo::new(path, remote, cache))
    }

    fn classify(&self, path: &Path) -> Status {
        self.classifier.classify(path)
    }
}
