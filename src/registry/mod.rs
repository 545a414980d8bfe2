//! Module registry
//!
//! The registry is built once per run: one pass over the manifest entries,
//! classifying each checkout, then one discovery pass per module directory
//! to pick up repositories the manifest does not declare.

pub mod discovery;

use crate::error::{ClassificationError, Result};
use crate::manifest::Manifest;
use crate::vcs::{Backend, CacheHandle, RepoHandle};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Working-tree status of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum Status {
    /// Clean checkout (or nothing on disk yet)
    Known,
    /// Local modifications; carries the first matching reason
    Dirty(String),
    /// Repository on disk that the manifest does not declare
    Unknown,
    /// Inspection itself failed. Never stored in a registry.
    Error(String),
}

impl Status {
    pub fn is_known(&self) -> bool {
        matches!(self, Status::Known)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Known => f.write_str("known"),
            Status::Dirty(reason) => f.write_str(reason),
            Status::Unknown => f.write_str("unknown"),
            Status::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    /// Title as declared; `None` for undeclared modules
    pub title: Option<String>,
    pub path: PathBuf,
    /// Declared source URL
    pub remote: Option<String>,
    pub desired_ref: Option<String>,
    /// Source URL of the checkout on disk
    pub origin: Option<String>,
    /// Commit currently checked out
    pub head: Option<String>,
    pub module_dir: PathBuf,
    pub status: Status,
    pub repo: Option<Arc<dyn RepoHandle>>,
    pub cache: Option<Arc<dyn CacheHandle>>,
}

impl Module {
    /// Whether the module carries the metadata a manifest line needs.
    pub fn is_declared(&self) -> bool {
        self.title.is_some() && self.remote.is_some() && self.desired_ref.is_some()
    }

    fn undeclared(name: String, path: PathBuf, module_dir: PathBuf) -> Self {
        Self {
            name,
            title: None,
            path,
            remote: None,
            desired_ref: None,
            origin: None,
            head: None,
            module_dir,
            status: Status::Unknown,
            repo: None,
            cache: None,
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    basedir: PathBuf,
    modules: Vec<Module>,
    caches: HashMap<String, Arc<dyn CacheHandle>>,
    trailer: Option<String>,
}

impl Registry {
    /// Parse `manifest_path`, classify every declared module and discover
    /// undeclared repositories next to them.
    ///
    /// Fails without building anything if the manifest cannot be parsed or
    /// any working tree cannot be inspected.
    pub fn load<B: Backend>(manifest_path: &Path, backend: &B) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let basedir = base_directory(manifest_path)?;
        Self::from_manifest(manifest, basedir, backend)
    }

    pub fn from_manifest<B: Backend>(manifest: Manifest, basedir: PathBuf, backend: &B) -> Result<Self> {
        let mut caches: HashMap<String, Arc<B::Cache>> = HashMap::new();
        let mut modules = Vec::with_capacity(manifest.entries.len());

        for entry in manifest.entries {
            let module_dir = basedir.join(&entry.module_dir);
            let path = module_dir.join(&entry.name);

            let status = backend.classify(&path);
            if let Status::Error(reason) = status {
                return Err(ClassificationError { path, reason }.into());
            }

            let cache = caches
                .entry(entry.remote.clone())
                .or_insert_with(|| backend.cache(&entry.remote))
                .clone();
            let repo = backend.repo(&path, &entry.remote, cache.clone());

            let origin = repo.origin().unwrap_or_else(|e| {
                tracing::debug!("Could not read origin of {}: {}", path.display(), e);
                None
            });
            let head = repo.head().unwrap_or_else(|e| {
                tracing::debug!("Could not read head of {}: {}", path.display(), e);
                None
            });

            tracing::debug!("Module {} at {} is {}", entry.name, path.display(), status);

            modules.push(Module {
                name: entry.name,
                title: Some(entry.title),
                path,
                remote: Some(entry.remote),
                desired_ref: Some(entry.desired_ref),
                origin,
                head,
                module_dir,
                status,
                repo: Some(repo),
                cache: Some(cache as Arc<dyn CacheHandle>),
            });
        }

        let caches = caches
            .into_iter()
            .map(|(remote, cache)| (remote, cache as Arc<dyn CacheHandle>))
            .collect();

        let mut registry = Registry {
            basedir,
            modules,
            caches,
            trailer: manifest.trailer,
        };
        discovery::discover(&mut registry)?;
        Ok(registry)
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub(crate) fn modules_mut(&mut self) -> &mut [Module] {
        &mut self.modules
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Modules that came from the manifest, in manifest order.
    pub fn declared(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.is_declared())
    }

    /// Names of undeclared repositories found on disk.
    pub fn unknown_modules(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.status == Status::Unknown)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Distinct module directories in first-seen order.
    pub fn module_dirs(&self) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = Vec::new();
        for module in &self.modules {
            if !dirs.contains(&module.module_dir.as_path()) {
                dirs.push(&module.module_dir);
            }
        }
        dirs
    }

    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    pub fn trailer(&self) -> Option<&str> {
        self.trailer.as_deref()
    }

    /// Path relative to the base directory, for display and manifest output.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.basedir).unwrap_or(path)
    }

    pub(crate) fn push_undeclared(&mut self, name: String, path: PathBuf, module_dir: PathBuf) {
        self.modules.push(Module::undeclared(name, path, module_dir));
    }
}

/// Absolute directory containing the manifest.
fn base_directory(manifest_path: &Path) -> Result<PathBuf> {
    let parent = match manifest_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(parent.canonicalize().or_else(|_| std::path::absolute(&parent))?)
}
