//! Fixtures built from real git repositories in temporary directories.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .args([
            "-c",
            "user.name=depsync test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn init_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
}

/// Write `file`, commit it, and return the new commit id.
pub fn commit_file(repo: &Path, file: &str, content: &str, message: &str) -> String {
    let path = repo.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    git(repo, &["add", file]);
    git(repo, &["commit", "--quiet", "-m", message]);
    git(repo, &["rev-parse", "HEAD"])
}

/// A project directory plus a set of upstream repositories to clone from.
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        Self { temp }
    }

    pub fn project(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    pub fn module(&self, name: &str) -> PathBuf {
        self.project().join("modules").join(name)
    }

    /// Upstream repository `name` with one commit on `main`.
    pub fn upstream(&self, name: &str) -> PathBuf {
        let path = self.temp.path().join("upstream").join(name);
        init_repo(&path);
        commit_file(&path, "README", &format!("{name}\n"), "Initial commit");
        commit_file(&path, "CHANGELOG", "* 1.0.0 Initial release\n", "Add changelog");
        path
    }

    pub fn remote(&self, name: &str) -> String {
        self.temp.path().join("upstream").join(name).display().to_string()
    }

    /// Write `<project>/Puppetfile.<method>` declaring `(title, ref)` modules,
    /// each cloned from the upstream of the same short name.
    pub fn manifest(&self, method: &str, modules: &[(&str, &str)]) -> PathBuf {
        let mut text = String::from("moduledir 'modules'\n\n");
        for (title, reference) in modules {
            let name = title.rsplit('-').next().unwrap();
            text.push_str(&format!(
                "mod '{title}',\n  :git => '{}',\n  :ref => '{reference}'\n\n",
                self.remote(name)
            ));
        }
        text.push_str("# vim: ai ts=2 sts=2 et sw=2 ft=ruby\n");

        let path = self.project().join(format!("Puppetfile.{method}"));
        fs::write(&path, text).unwrap();
        path
    }
}
