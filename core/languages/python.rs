use crate::languages::dedup;
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
    with_suffix,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".py", ".pyi"];
const KIND: &str = "module";

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*import[ \t]+([^#\n]+)").expect("python import regex"));
static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*from[ \t]+(\.*[\w.]*)[ \t]+import[ \t]+\(?([^#\n)]*)")
        .expect("python from-import regex")
});

pub struct Python;

impl LanguagePlugin for Python {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let mut found = Vec::new();
        for captures in IMPORT.captures_iter(content) {
            for module in split_names(&captures[1]) {
                found.push(Specifier::classified(KIND, module));
            }
        }
        for captures in FROM_IMPORT.captures_iter(content) {
            let module = &captures[1];
            if module.is_empty() {
                continue;
            }
            found.push(Specifier::classified(KIND, module));
            // `from pkg import sub` may name a submodule rather than a symbol.
            for name in split_names(&captures[2]).filter(|n| *n != "*") {
                let joined = if module.ends_with('.') {
                    format!("{}{}", module, name)
                } else {
                    format!("{}.{}", module, name)
                };
                found.push(Specifier::classified(KIND, joined));
            }
        }
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

/// `a.b as c, d` -> `a.b`, `d`
fn split_names(list: &str) -> impl Iterator<Item = &str> {
    list.split(',')
        .filter_map(|part| part.split_whitespace().next())
        .filter(|name| name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '*'))
}

impl Resolver for Python {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let module = specifier.value();
        let dots = module.chars().take_while(|c| *c == '.').count();
        let dotted = &module[dots..];

        if dots > 0 {
            let mut base = ctx.current_dir().to_path_buf();
            for _ in 1..dots {
                base = base.parent()?.to_path_buf();
            }
            return module_file(&base, dotted);
        }

        search_roots(ctx)
            .iter()
            .find_map(|root| module_file(root, dotted))
    }
}

fn search_roots(ctx: &ResolutionContext<'_>) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for dir in ctx.current_dir().ancestors() {
        roots.push(dir.to_path_buf());
        if dir == ctx.project_root || !dir.starts_with(ctx.project_root) {
            break;
        }
    }
    let src = ctx.project_root.join("src");
    if !roots.contains(&src) {
        roots.push(src);
    }
    roots
}

fn module_file(base: &Path, dotted: &str) -> Option<PathBuf> {
    if dotted.is_empty() {
        return existing_file(&base.join("__init__.py"));
    }
    let relative: PathBuf = dotted.split('.').filter(|s| !s.is_empty()).collect();
    let module = base.join(relative);
    [".py", ".pyi"]
        .iter()
        .find_map(|ext| existing_file(&with_suffix(&module, ext)))
        .or_else(|| existing_file(&module.join("__init__.py")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_plain_and_from_imports() {
        let source = "import os, sys as system\nfrom . import helpers\nfrom ..core.models import (User, Group)\nfrom pkg import *\n";
        let found = Python.scan(source, &ScanContext { file: Path::new("a.py") });
        let values: Vec<&str> = found.iter().map(Specifier::value).collect();
        assert_eq!(
            values,
            vec![
                "os",
                "sys",
                ".",
                ".helpers",
                "..core.models",
                "..core.models.User",
                "..core.models.Group",
                "pkg",
            ]
        );
        assert!(found.iter().all(|s| s.is_kind("module")));
    }

    #[test]
    fn resolves_relative_and_absolute_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/core")).unwrap();
        fs::write(root.join("app/__init__.py"), "").unwrap();
        fs::write(root.join("app/core/__init__.py"), "").unwrap();
        fs::write(root.join("app/core/models.py"), "").unwrap();
        fs::write(root.join("app/views.py"), "").unwrap();

        let current = root.join("app/views.py");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let relative = Python
            .resolve(&Specifier::classified("module", ".core.models"), &ctx)
            .unwrap();
        assert!(relative.ends_with("app/core/models.py"));
        let package = Python
            .resolve(&Specifier::classified("module", "app.core"), &ctx)
            .unwrap();
        assert!(package.ends_with("app/core/__init__.py"));
        assert!(
            Python
                .resolve(&Specifier::classified("module", "requests"), &ctx)
                .is_none()
        );
    }
}
