//! Discovery of undeclared repositories
//!
//! Anything in a module directory that carries a `.git` marker but is not in
//! the manifest is added as an [`Unknown`](super::Status::Unknown) module.
//! Such modules are reported but never synchronized or written out.

use super::Registry;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the marker that identifies a git checkout.
pub const VCS_MARKER: &str = ".git";

pub fn is_repository(path: &Path) -> bool {
    path.join(VCS_MARKER).exists()
}

/// Scan every distinct module directory of `registry` and append undeclared
/// repositories. Returns how many were found.
pub fn discover(registry: &mut Registry) -> io::Result<usize> {
    let dirs: Vec<PathBuf> = registry
        .module_dirs()
        .into_iter()
        .map(Path::to_path_buf)
        .collect();

    let mut found = 0;
    for module_dir in dirs {
        for (name, path) in undeclared_in(registry, &module_dir)? {
            tracing::info!("Found undeclared repository {}", path.display());
            registry.push_undeclared(name, path, module_dir.clone());
            found += 1;
        }
    }

    Ok(found)
}

fn undeclared_in(registry: &Registry, module_dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    if !module_dir.is_dir() {
        return Ok(Vec::new());
    }

    let known: HashSet<&Path> = registry
        .modules()
        .iter()
        .filter(|m| m.module_dir == module_dir)
        .map(|m| m.path.as_path())
        .collect();

    let mut undeclared = Vec::new();
    for entry in std::fs::read_dir(module_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_dir() || known.contains(path.as_path()) || !is_repository(&path) {
            continue;
        }
        undeclared.push((entry.file_name().to_string_lossy().into_owned(), path));
    }

    undeclared.sort();
    Ok(undeclared)
}

#[cfg(test)]
mod tests {
    use crate::registry::{Registry, Status};
    use crate::vcs::fake::FakeBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_only_version_controlled_directories_are_reported() {
        let temp = TempDir::new().unwrap();
        let modules = temp.path().join("modules");
        fs::create_dir_all(modules.join("a/.git")).unwrap();
        fs::create_dir_all(modules.join("c")).unwrap();
        fs::create_dir_all(modules.join("d/.git")).unwrap();
        fs::write(modules.join("README"), "not a module").unwrap();

        let manifest = temp.path().join("Puppetfile.tracking");
        fs::write(
            &manifest,
            "mod 'a', :git => 'u/a', :ref => 'main'\nmod 'b', :git => 'u/b', :ref => 'main'\n",
        )
        .unwrap();

        let registry = Registry::load(&manifest, &FakeBackend::default()).unwrap();

        assert_eq!(registry.unknown_modules(), ["d"]);
        assert!(registry.get("c").is_none());

        let d = registry.get("d").unwrap();
        assert_eq!(d.status, Status::Unknown);
        assert!(d.repo.is_none() && d.cache.is_none() && d.desired_ref.is_none());
        assert!(!d.is_declared());

        // Declared but absent from disk stays declared
        assert_eq!(registry.get("b").unwrap().status, Status::Known);
    }

    #[test]
    fn test_missing_module_dir_is_ignored() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("Puppetfile.tracking");
        fs::write(&manifest, "moduledir 'nowhere'\nmod 'a', :git => 'u/a'\n").unwrap();

        let registry = Registry::load(&manifest, &FakeBackend::default()).unwrap();
        assert_eq!(registry.modules().len(), 1);
    }
}
