//! History queries used by the changelog reports.

use super::{git, run};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset};
use git2::{ObjectType, Repository};
use std::path::Path;

/// Date format understood by `git log --since`.
const GIT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Commit id for `reference`, also trying remote-tracking names since module
/// checkouts are detached.
pub fn resolve_rev(repo_dir: &Path, reference: &str) -> Option<String> {
    let repo = Repository::open(repo_dir).ok()?;
    [
        reference.to_string(),
        format!("origin/{reference}"),
        format!("cache/{reference}"),
    ]
    .iter()
    .find_map(|candidate| {
        repo.revparse_single(candidate)
            .and_then(|object| object.peel_to_commit())
            .map(|commit| commit.id().to_string())
            .ok()
    })
}

/// Author timestamp of `reference`, formatted for `--since`.
pub fn commit_date(repo_dir: &Path, reference: &str) -> Result<String> {
    let repo = Repository::open(repo_dir)
        .with_context(|| format!("{} is not a Git repository", repo_dir.display()))?;
    let commit = repo
        .revparse_single(reference)
        .and_then(|object| object.peel_to_commit())
        .with_context(|| format!("Could not find a Git log for {reference}"))?;

    let time = commit.author().when();
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .ok_or_else(|| anyhow!("Invalid timezone offset on {reference}"))?;
    let date = DateTime::from_timestamp(time.seconds(), 0)
        .ok_or_else(|| anyhow!("Invalid commit time on {reference}"))?
        .with_timezone(&offset);

    Ok(date.format(GIT_DATE_FORMAT).to_string())
}

/// Contents of `file` (relative to the work tree root) as of `reference`.
pub fn show_file(repo_dir: &Path, reference: &str, file: &Path) -> Result<String> {
    let repo = Repository::discover(repo_dir)
        .with_context(|| format!("{} is not inside a Git repository", repo_dir.display()))?;
    let tree = repo
        .revparse_single(reference)
        .and_then(|object| object.peel_to_tree())
        .with_context(|| format!("Unknown revision {reference}"))?;

    let relative = match repo.workdir() {
        Some(workdir) => {
            let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
            let dir = repo_dir.canonicalize().unwrap_or_else(|_| repo_dir.to_path_buf());
            dir.strip_prefix(&workdir).map(|p| p.join(file)).unwrap_or_else(|_| file.to_path_buf())
        }
        None => file.to_path_buf(),
    };

    let entry = tree
        .get_path(&relative)
        .with_context(|| format!("Could not retrieve {} from {}", relative.display(), reference))?;
    let object = entry.to_object(&repo)?;
    let blob = object
        .as_blob()
        .filter(|_| entry.kind() == Some(ObjectType::Blob))
        .ok_or_else(|| anyhow!("{} is not a file at {}", relative.display(), reference))?;

    Ok(String::from_utf8_lossy(blob.content()).into_owned())
}

/// `git log --stat --reverse` for commits after `since`.
pub fn log_since(repo_dir: &Path, since: &str) -> Result<String> {
    let log = run(git(repo_dir).args(["log", "--stat", "--reverse", &format!("--since={since}")]))?;
    Ok(log.trim_end().to_string())
}

/// `git log --stat --reverse` for `from..to`.
pub fn log_range(repo_dir: &Path, from: &str, to: &str) -> Result<String> {
    let log = run(git(repo_dir).args(["log", "--stat", "--reverse", &format!("{from}..{to}")]))?;
    Ok(log.trim_end().to_string())
}

/// Lines added to `file` between `from` and the work tree.
pub fn added_lines(repo_dir: &Path, from: &str, file: &Path) -> Result<String> {
    let diff = run(git(repo_dir).args(["diff", from, "--"]).arg(file))?;
    Ok(added_lines_of(&diff))
}

/// Keep only the `+` lines of a unified diff, without the marker and
/// without the `+++` file header.
pub fn added_lines_of(diff: &str) -> String {
    diff.lines()
        .filter(|line| line.starts_with('+') && !line.starts_with("+++"))
        .map(|line| &line[1..])
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_lines_of() {
        let diff = "\
diff --git a/CHANGELOG b/CHANGELOG
index 1111111..2222222 100644
--- a/CHANGELOG
+++ b/CHANGELOG
@@ -1,2 +1,4 @@
+* 1.1.0 Fixed the frobnicator
+
 * 1.0.0 Initial release
-* typo
";
        assert_eq!(added_lines_of(diff), "* 1.1.0 Fixed the frobnicator\n");
    }

    #[test]
    fn test_added_lines_of_empty_diff() {
        assert_eq!(added_lines_of(""), "");
    }

    #[test]
    fn test_queries_outside_a_repository() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(resolve_rev(temp.path(), "main").is_none());
        assert!(commit_date(temp.path(), "main").is_err());
    }
}
