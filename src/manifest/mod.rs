//! Manifest parsing
//!
//! A manifest is a Puppetfile-style list of `moduledir` headers and git
//! `mod` declarations. Parsing is purely textual: nothing here touches the
//! checkouts themselves, that happens when a [`Registry`](crate::registry::Registry)
//! is built from the parsed entries.

pub mod writer;

use crate::error::ManifestParseError;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub use writer::render;

/// Module directory used until the first `moduledir` header.
pub const DEFAULT_MODULE_DIR: &str = "modules";

/// Desired reference when a declaration names none.
pub const DEFAULT_REF: &str = "master";

static MODULEDIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^moduledir\s+['"]([^'"]+)['"]$"#).expect("Failed to compile moduledir regex")
});

static MOD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^mod\s+['"]([^'"]+)['"]\s*(?:,\s*(.*))?$"#).expect("Failed to compile mod regex")
});

// Accepts both `:git => 'url'` and `git: 'url'`
static OPTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?::(\w+)\s*=>|\b(\w+):)\s*['"]([^'"]*)['"]"#)
        .expect("Failed to compile option regex")
});

/// One `mod` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Title as written, e.g. `simp-foo`
    pub title: String,
    /// Short name derived from the title, e.g. `foo`
    pub name: String,
    pub remote: String,
    pub desired_ref: String,
    /// Module directory as declared (relative to the manifest or absolute)
    pub module_dir: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub path: PathBuf,
    pub entries: Vec<ManifestEntry>,
    /// Trailing comment line, re-emitted verbatim on output
    pub trailer: Option<String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestParseError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestParseError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse manifest text. `path` is only used for error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ManifestParseError> {
        let malformed = |line: usize, message: String| ManifestParseError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut module_dir = PathBuf::from(DEFAULT_MODULE_DIR);

        for (line, statement) in statements(text) {
            if let Some(caps) = MODULEDIR_REGEX.captures(&statement) {
                module_dir = PathBuf::from(&caps[1]);
                continue;
            }

            if statement.starts_with("forge ") || statement == "forge" {
                continue;
            }

            let Some(caps) = MOD_REGEX.captures(&statement) else {
                return Err(malformed(
                    line,
                    format!("expected 'mod' or 'moduledir', found '{statement}'"),
                ));
            };

            let title = caps[1].to_string();
            let options = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let entry = parse_declaration(&title, options, &module_dir, line)
                .map_err(|message| malformed(line, message))?;

            if !seen.insert((entry.module_dir.clone(), entry.name.clone())) {
                return Err(malformed(
                    line,
                    format!(
                        "duplicate module '{}' in '{}'",
                        entry.name,
                        entry.module_dir.display()
                    ),
                ));
            }

            entries.push(entry);
        }

        Ok(Manifest {
            path: path.to_path_buf(),
            entries,
            trailer: trailer(text),
        })
    }
}

/// Derive the on-disk module name from a title (`simp-foo`, `simp/foo` -> `foo`).
pub fn module_name(title: &str) -> &str {
    title
        .rsplit(|c: char| c == '/' || c == '-')
        .next()
        .unwrap_or(title)
}

fn parse_declaration(
    title: &str,
    options: &str,
    module_dir: &Path,
    line: usize,
) -> Result<ManifestEntry, String> {
    let mut remote = None;
    let mut desired_ref = None;
    let mut install_path = None;

    for caps in OPTION_REGEX.captures_iter(options) {
        let key = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
        let value = caps[3].to_string();
        match key {
            "git" => remote = Some(value),
            "ref" | "branch" | "tag" | "commit" => {
                desired_ref.get_or_insert(value);
            }
            "install_path" => install_path = Some(PathBuf::from(value)),
            other => tracing::debug!("Ignoring option '{}' on module '{}'", other, title),
        }
    }

    let remote = remote.ok_or_else(|| format!("module '{title}' does not declare a :git source"))?;
    let name = module_name(title);
    if name.is_empty() {
        return Err(format!("module title '{title}' has no name"));
    }

    Ok(ManifestEntry {
        title: title.to_string(),
        name: name.to_string(),
        remote,
        desired_ref: desired_ref.unwrap_or_else(|| DEFAULT_REF.to_string()),
        module_dir: install_path.unwrap_or_else(|| module_dir.to_path_buf()),
        line,
    })
}

/// Join continuation lines (a line ending in `,` continues the statement)
/// and drop comments. Yields the starting line number with each statement.
fn statements(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        match current.as_mut() {
            Some((_, statement)) => {
                statement.push(' ');
                statement.push_str(line);
            }
            None => current = Some((idx + 1, line.to_string())),
        }

        if !line.ends_with(',') {
            out.extend(current.take());
        }
    }

    out.extend(current);
    out
}

fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (idx, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..idx],
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if q == c => quote = None,
            _ => {}
        }
    }
    line
}

fn trailer(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .filter(|line| line.trim_start().starts_with('#'))
        .map(|line| line.trim_end().to_string())
}
