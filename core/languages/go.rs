use crate::languages::{capture_all, dedup};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, is_relative_reference,
    normalize_path,
};
use log;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".go"];
const KIND: &str = "package";

static SINGLE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"]+)""#).expect("go import regex")
});
static GROUPED_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bimport[ \t]*\((.*?)\)").expect("go import group regex"));
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"\n]+)""#).expect("quoted regex"));
static MODULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^module[ \t]+(\S+)").expect("go.mod module regex"));

pub struct Go;

impl LanguagePlugin for Go {
    fn name(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let mut found: Vec<Specifier> = capture_all(&SINGLE_IMPORT, content)
            .into_iter()
            .map(|p| Specifier::classified(KIND, p))
            .collect();
        for group in GROUPED_IMPORT.captures_iter(content) {
            found.extend(
                capture_all(&QUOTED, &group[1])
                    .into_iter()
                    .map(|p| Specifier::classified(KIND, p)),
            );
        }
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Go {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let import = specifier.value();
        let package_dir = if is_relative_reference(import) {
            normalize_path(&ctx.current_dir().join(import))
        } else {
            let (module_root, module_path) = find_go_module(ctx)?;
            if import == module_path {
                module_root
            } else {
                let rest = import.strip_prefix(&format!("{}/", module_path))?;
                module_root.join(rest)
            }
        };
        first_package_file(&package_dir)
    }
}

/// Nearest `go.mod` at or above the current file, with its declared module path.
fn find_go_module(ctx: &ResolutionContext<'_>) -> Option<(PathBuf, String)> {
    let dir = ctx
        .current_dir()
        .ancestors()
        .take_while(|dir| dir.starts_with(ctx.project_root))
        .find(|dir| dir.join("go.mod").is_file())?;
    let manifest = fs::read_to_string(dir.join("go.mod"))
        .map_err(|e| log::debug!("Cannot read go.mod in {}: {}", dir.display(), e))
        .ok()?;
    let module_path = MODULE_LINE.captures(&manifest)?[1].to_string();
    Some((dir.to_path_buf(), module_path))
}

/// A package is a directory; the first non-test source file stands in for it.
fn first_package_file(dir: &Path) -> Option<PathBuf> {
    let mut sources: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".go") && !n.ends_with("_test.go"))
        })
        .collect();
    sources.sort();
    sources.into_iter().next().map(|p| normalize_path(&p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_single_and_grouped_imports() {
        let source = "package main\n\nimport \"fmt\"\nimport (\n\tlog \"github.com/x/log\"\n\t\"example.com/app/internal/store\"\n)\n";
        let found = Go.scan(source, &ScanContext { file: Path::new("main.go") });
        let values: Vec<&str> = found.iter().map(Specifier::value).collect();
        assert_eq!(
            values,
            vec!["fmt", "github.com/x/log", "example.com/app/internal/store"]
        );
    }

    #[test]
    fn resolves_module_local_packages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("internal/store")).unwrap();
        fs::write(root.join("go.mod"), "module example.com/app\n\ngo 1.22\n").unwrap();
        fs::write(root.join("internal/store/store_test.go"), "").unwrap();
        fs::write(root.join("internal/store/store.go"), "").unwrap();
        fs::write(root.join("internal/store/cache.go"), "").unwrap();

        let current = root.join("main.go");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let found = Go
            .resolve(
                &Specifier::classified(KIND, "example.com/app/internal/store"),
                &ctx,
            )
            .unwrap();
        assert!(found.ends_with("internal/store/cache.go"));
        assert!(
            Go.resolve(&Specifier::classified(KIND, "fmt"), &ctx)
                .is_none()
        );
    }
}
