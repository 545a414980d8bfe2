//! Configuration management for depsync
//!
//! Typed settings with defaults. Loading and layering of the sources lives in
//! [`core`]; see `default-config.toml` for the shipped values.

pub mod core;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for depsync
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DepsConfig {
    pub general: GeneralConfig,

    /// Worker pool used by `checkout`
    pub checkout: CheckoutConfig,

    /// Working-tree classification
    pub classify: ClassifyConfig,

    pub cache: CacheConfig,

    pub manifest: ManifestConfig,

    pub changelog: ChangelogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Print every skipped module instead of a summary
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Upper bound on workers (0 = no limit beyond the host)
    pub max_threads: usize,

    /// Percentage of CPU cores to use
    pub thread_percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Untracked paths that never make a module dirty (ignore-file syntax)
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Mirror directory, relative to the project base directory
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest files are named `<prefix>.<method>`
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChangelogConfig {
    /// Changelog file name inside each module
    pub file: PathBuf,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            thread_percentage: 100,
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            exclude: vec!["build/rpm_metadata".to_string(), "dist/".to_string()],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".depsync_cache"),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            prefix: "Puppetfile".to_string(),
        }
    }
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("CHANGELOG"),
        }
    }
}

impl DepsConfig {
    /// Manifest file name for `method`, e.g. `Puppetfile.tracking`.
    pub fn manifest_name(&self, method: &str) -> String {
        format!("{}.{}", self.manifest.prefix, method)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.checkout.thread_percentage) {
            anyhow::bail!(
                "checkout.thread_percentage must be between 1 and 100, got {}",
                self.checkout.thread_percentage
            );
        }

        if self.manifest.prefix.trim().is_empty() {
            anyhow::bail!("manifest.prefix cannot be empty");
        }

        if self.cache.root.as_os_str().is_empty() {
            anyhow::bail!("cache.root cannot be empty");
        }

        Ok(())
    }
}
