//! Project-level operations
//!
//! Each command loads the manifest variant it needs through a [`Workspace`],
//! does its work, and hands a structured result back. Nothing here prints;
//! presentation is up to the caller.

pub mod changelog;
pub mod checkout;
pub mod record;
pub mod status;

use crate::config::DepsConfig;
use crate::git::GitBackend;
use crate::parallel::ExecutionStrategy;
use crate::registry::Registry;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use changelog::{changelog, changelog2};
pub use checkout::{checkout, checkout_with_progress};
pub use record::record;
pub use status::{ChangedModule, StatusReport, status};

/// Manifest variant used by `checkout` and `status` by default.
pub const DEFAULT_METHOD: &str = "tracking";

/// Manifest variant written by `record` by default.
pub const DEFAULT_RECORD_METHOD: &str = "stable";

/// A project directory holding manifests, with its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    basedir: PathBuf,
    config: DepsConfig,
    backend: GitBackend,
}

impl Workspace {
    pub fn new(basedir: &Path, config: DepsConfig) -> Result<Self> {
        let basedir = basedir
            .canonicalize()
            .with_context(|| format!("Project directory {} does not exist", basedir.display()))?;
        let backend = GitBackend::from_config(&basedir, &config)?;
        Ok(Self {
            basedir,
            config,
            backend,
        })
    }

    /// Workspace for `basedir` with configuration loaded from the usual sources.
    pub fn open(basedir: &Path, custom_config: Option<&Path>) -> Result<Self> {
        let config = DepsConfig::load(basedir, custom_config)?;
        Self::new(basedir, config)
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn config(&self) -> &DepsConfig {
        &self.config
    }

    pub fn backend(&self) -> &GitBackend {
        &self.backend
    }

    pub fn manifest_path(&self, method: &str) -> PathBuf {
        self.basedir.join(self.config.manifest_name(method))
    }

    /// Build the registry for manifest variant `method`.
    pub fn load(&self, method: &str) -> Result<Registry> {
        let path = self.manifest_path(method);
        tracing::debug!("Loading {}", path.display());
        Ok(Registry::load(&path, &self.backend)?)
    }

    /// Execution strategy for the configured worker limits.
    pub fn strategy(&self) -> ExecutionStrategy {
        let workers = ExecutionStrategy::calculate_optimal_workers(
            self.config.checkout.max_threads,
            self.config.checkout.thread_percentage,
        );
        ExecutionStrategy::for_workers(workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_path_uses_prefix() {
        let temp = TempDir::new().unwrap();
        let mut config = DepsConfig::default();
        config.manifest.prefix = "Depfile".to_string();

        let workspace = Workspace::new(temp.path(), config).unwrap();
        assert_eq!(
            workspace.manifest_path("stable"),
            temp.path().canonicalize().unwrap().join("Depfile.stable")
        );
        assert_eq!(
            workspace.backend().cache_root(),
            temp.path().canonicalize().unwrap().join(".depsync_cache")
        );
    }

    #[test]
    fn test_single_thread_limit_runs_inline() {
        let temp = TempDir::new().unwrap();
        let mut config = DepsConfig::default();
        config.checkout.max_threads = 1;

        let workspace = Workspace::new(temp.path(), config).unwrap();
        assert_eq!(workspace.strategy(), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_missing_directory() {
        assert!(Workspace::new(Path::new("/nonexistent/project"), DepsConfig::default()).is_err());
    }
}
