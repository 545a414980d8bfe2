//! Manifest serialization
//!
//! Renders the declared modules of a registry back into manifest text,
//! pinning each one to the commit currently checked out.

use crate::registry::{Module, Registry};
use std::fmt::Write;
use std::path::Path;

/// Render `registry` as manifest text.
///
/// Modules keep their registry order. A `moduledir` header starts a new block
/// whenever a module's directory differs from the previous block's; undeclared
/// modules are skipped.
pub fn render(registry: &Registry) -> String {
    let mut out = String::new();
    let mut current_dir: Option<&Path> = None;

    for module in registry.declared() {
        if current_dir != Some(module.module_dir.as_path()) {
            let dir = registry.relative(&module.module_dir);
            let _ = writeln!(out, "moduledir '{}'\n", dir.display());
            current_dir = Some(&module.module_dir);
        }
        render_module(&mut out, module);
    }

    if let Some(trailer) = registry.trailer() {
        out.push_str(trailer);
        out.push('\n');
    }

    out
}

fn render_module(out: &mut String, module: &Module) {
    let title = module.title.as_deref().unwrap_or(&module.name);
    let remote = module
        .origin
        .as_deref()
        .or(module.remote.as_deref())
        .unwrap_or_default();
    let reference = module
        .head
        .as_deref()
        .or(module.desired_ref.as_deref())
        .unwrap_or_default();

    let _ = writeln!(out, "mod '{title}',\n  :git => '{remote}',\n  :ref => '{reference}'\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::vcs::fake::FakeBackend;
    use std::fs;
    use tempfile::TempDir;

    fn load(text: &str) -> (TempDir, Registry) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Puppetfile.tracking");
        fs::write(&path, text).unwrap();
        let registry = Registry::load(&path, &FakeBackend::default()).unwrap();
        (temp, registry)
    }

    #[test]
    fn test_render_pins_heads() {
        let (_temp, registry) = load(
            "moduledir 'src/modules'\nmod 'simp-foo', :git => 'https://example.com/foo.git', :ref => 'main'\n",
        );

        assert_eq!(
            render(&registry),
            "moduledir 'src/modules'\n\n\
             mod 'simp-foo',\n  :git => 'https://example.com/foo.git',\n  :ref => 'sha-initial'\n\n"
        );
    }

    #[test]
    fn test_directory_blocks_follow_insertion_order() {
        let (_temp, registry) = load(
            "moduledir 'a'\nmod 'one', :git => 'u1'\n\
             moduledir 'b'\nmod 'two', :git => 'u2'\n\
             moduledir 'a'\nmod 'three', :git => 'u3'\n\
             # trailer\n",
        );

        let text = render(&registry);
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("moduledir")).collect();
        assert_eq!(headers, ["moduledir 'a'", "moduledir 'b'", "moduledir 'a'"]);
        assert!(text.ends_with("# trailer\n"));
    }

    #[test]
    fn test_undeclared_modules_are_not_written() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("modules/stray/.git")).unwrap();
        let path = temp.path().join("Puppetfile.tracking");
        fs::write(&path, "mod 'kept', :git => 'u1'\n").unwrap();

        let registry = Registry::load(&path, &FakeBackend::default()).unwrap();
        assert_eq!(registry.unknown_modules(), ["stray"]);

        let text = render(&registry);
        assert!(text.contains("mod 'kept'"));
        assert!(!text.contains("stray"));
    }

    #[test]
    fn test_rendered_text_parses_back() {
        let (_temp, registry) = load(
            "moduledir 'src/modules'\n\
             mod 'simp-foo', :git => 'u1', :ref => 'main'\n\
             mod 'simp-bar', :git => 'u2', :ref => 'v2'\n",
        );

        let reparsed = Manifest::parse(&render(&registry), Path::new("Puppetfile.stable")).unwrap();
        let pinned: Vec<(&str, &str)> = reparsed
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.desired_ref.as_str()))
            .collect();
        assert_eq!(pinned, [("foo", "sha-initial"), ("bar", "sha-initial")]);
    }
}
