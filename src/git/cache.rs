use super::{git, output, run};
use crate::vcs::CacheHandle;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Bare mirror of one source URL, shared by every module cloned from it.
#[derive(Debug)]
pub struct GitCache {
    remote: String,
    path: PathBuf,
    fresh: AtomicBool,
    /// Held for the duration of a fetch or clone into `path`
    sync_lock: Mutex<()>,
}

impl GitCache {
    pub fn new(cache_root: &Path, remote: &str) -> Self {
        Self {
            remote: remote.to_string(),
            path: cache_root.join(sanitize(remote)),
            fresh: AtomicBool::new(false),
            sync_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.join("HEAD").is_file()
    }

    /// Commit id that `reference` (branch, tag or commit) points to.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        if !self.exists() {
            return None;
        }

        let output = output(
            git(&self.path).args(["rev-parse", "--verify", "--quiet", &format!("{reference}^{{commit}}")]),
        )
        .ok()?;

        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .filter(|sha| !sha.is_empty())
    }

    pub fn is_branch(&self, reference: &str) -> bool {
        self.exists()
            && output(git(&self.path).args([
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{reference}"),
            ]))
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn fetch(&self) -> Result<()> {
        tracing::debug!("Fetching {} into {}", self.remote, self.path.display());
        run(git(&self.path).args(["fetch", "--prune", "--quiet", "origin"]))
            .with_context(|| format!("Failed to fetch {}", self.remote))?;
        Ok(())
    }

    /// Mirror-clone next to the final location, then move it into place.
    /// Losing the rename to a concurrent worker leaves a good cache behind.
    fn create(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache root {}", parent.display()))?;

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = parent.join(format!(".{name}.{}", uuid::Uuid::new_v4()));

        tracing::debug!("Cloning {} into cache {}", self.remote, self.path.display());
        let cloned = run(git(parent)
            .args(["clone", "--mirror", "--quiet", &self.remote])
            .arg(&staging))
        .with_context(|| format!("Failed to clone {}", self.remote));

        if let Err(e) = cloned {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_dir_all(&staging);
            if !self.exists() {
                return Err(e).with_context(|| format!("Failed to move cache into {}", self.path.display()));
            }
            tracing::debug!("Cache {} was created concurrently", self.path.display());
        }

        Ok(())
    }
}

impl CacheHandle for GitCache {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    fn sync(&self) -> Result<()> {
        let _guard = self.sync_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_fresh() {
            return Ok(());
        }

        if self.exists() {
            self.fetch()?;
        } else {
            self.create()?;
        }

        tracing::info!("Synchronized cache for {}", self.remote);
        self.fresh.store(true, Ordering::Release);
        Ok(())
    }
}

/// Directory name for a remote: every non-alphanumeric character becomes `-`.
pub fn sanitize(remote: &str) -> String {
    remote
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    fn git_in(dir: &Path, args: &[&str]) -> String {
        let out = std::process::Command::new("git")
            .current_dir(dir)
            .args(["-c", "user.name=depsync test", "-c", "user.email=test@example.com"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .output()
            .unwrap();
        assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    fn commit(dir: &Path, content: &str) -> String {
        std::fs::write(dir.join("README"), content).unwrap();
        git_in(dir, &["add", "README"]);
        git_in(dir, &["commit", "--quiet", "-m", content]);
        git_in(dir, &["rev-parse", "HEAD"])
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(
            sanitize("https://github.com/simp/pupmod-simp-foo.git"),
            "https---github-com-simp-pupmod-simp-foo-git"
        );
        assert_eq!(sanitize("git@host:org/my_repo"), "git-host-org-my-repo");
    }

    #[test]
    fn test_missing_cache_resolves_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let cache = GitCache::new(temp.path(), "https://example.com/none.git");
        assert!(!cache.exists());
        assert!(!cache.is_fresh());
        assert_eq!(cache.resolve("main"), None);
        assert!(!cache.is_branch("main"));
    }

    #[test]
    fn test_concurrent_sync_of_shared_cache() {
        let temp = tempfile::TempDir::new().unwrap();
        let upstream = temp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        git_in(&upstream, &["init", "--quiet"]);
        git_in(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        commit(&upstream, "one\n");
        for i in 0..100 {
            git_in(&upstream, &["branch", &format!("b{i}")]);
        }

        let remote = upstream.display().to_string();
        let root = temp.path().join("cache");
        GitCache::new(&root, &remote).sync().unwrap();

        let moved = commit(&upstream, "two\n");
        for i in 0..100 {
            git_in(&upstream, &["branch", "--force", &format!("b{i}"), "HEAD"]);
        }

        let cache = Arc::new(GitCache::new(&root, &remote));
        let barrier = Arc::new(Barrier::new(4));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    cache.sync().map_err(|e| format!("{e:#}"))
                })
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap(), Ok(()));
        }
        assert!(cache.is_fresh());
        assert_eq!(cache.resolve("b0").as_deref(), Some(moved.as_str()));
        assert_eq!(cache.resolve("b99").as_deref(), Some(moved.as_str()));
    }

    #[test]
    fn test_concurrent_creation_of_missing_cache() {
        let temp = tempfile::TempDir::new().unwrap();
        let upstream = temp.path().join("upstream");
        std::fs::create_dir_all(&upstream).unwrap();
        git_in(&upstream, &["init", "--quiet"]);
        git_in(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        let head = commit(&upstream, "one\n");

        let cache = Arc::new(GitCache::new(&temp.path().join("cache"), &upstream.display().to_string()));
        let barrier = Arc::new(Barrier::new(3));
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    cache.sync().is_ok()
                })
            })
            .collect();

        assert!(workers.into_iter().all(|w| w.join().unwrap()));
        assert!(cache.exists());
        assert_eq!(cache.resolve("main").as_deref(), Some(head.as_str()));
        assert!(cache.is_branch("main"));
    }
}
