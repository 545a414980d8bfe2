//! Glob pattern utilities
//!
//! Exclusion patterns are written the way `.gitignore` entries are
//! (`dist/`, `build/rpm_metadata`, `*.rpm`) and compiled into a single
//! [`GlobSet`] matched against paths relative to a module root.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Expand one ignore-style pattern into the globs that implement it.
///
/// - a trailing `/` restricts the pattern to directories (everything below it);
/// - a pattern containing `/` is anchored at the module root;
/// - otherwise it matches at any depth.
pub fn exclusion_globs(pattern: &str) -> Vec<String> {
    let dir_only = pattern.ends_with('/');
    let trimmed = pattern.trim_end_matches('/');

    let base = if trimmed.contains('/') {
        trimmed.trim_start_matches('/').to_string()
    } else {
        format!("**/{trimmed}")
    };

    if dir_only {
        vec![format!("{base}/**")]
    } else {
        vec![base.clone(), format!("{base}/**")]
    }
}

/// Create a GlobSet from ignore-style exclusion patterns
pub fn build_exclusion_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.iter().filter(|p| !p.trim().is_empty()) {
        for glob in exclusion_globs(pattern.trim()) {
            let glob = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .with_context(|| format!("Invalid exclusion pattern '{pattern}'"))?;
            builder.add(glob);
        }
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> GlobSet {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        build_exclusion_set(&patterns).unwrap()
    }

    #[test]
    fn test_directory_pattern() {
        let set = set(&["dist/"]);
        assert!(set.is_match("dist/pkg-1.0.rpm"));
        assert!(set.is_match("sub/dist/pkg-1.0.rpm"));
        assert!(!set.is_match("dist"));
        assert!(!set.is_match("distribution.txt"));
    }

    #[test]
    fn test_anchored_pattern() {
        let set = set(&["build/rpm_metadata"]);
        assert!(set.is_match("build/rpm_metadata"));
        assert!(set.is_match("build/rpm_metadata/release"));
        assert!(!set.is_match("other/build/rpm_metadata"));
        assert!(!set.is_match("build/other"));
    }

    #[test]
    fn test_unanchored_wildcard() {
        let set = set(&["*.rpm"]);
        assert!(set.is_match("pkg.rpm"));
        assert!(set.is_match("deep/nested/pkg.rpm"));
        assert!(!set.is_match("pkg.rpm.txt"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(build_exclusion_set(&["[".to_string()]).is_err());
    }
}
