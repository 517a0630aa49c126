use crate::languages::{dedup, is_remote_reference};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
    with_suffix,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less"];
const KIND: &str = "stylesheet_import";

static AT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@(?:import|use|forward)[ \t]+(?:url\()?[ \t]*["']?([^"'\s);]+)"#)
        .expect("stylesheet import regex")
});

pub struct Css;

impl LanguagePlugin for Css {
    fn name(&self) -> &'static str {
        "css"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let found = AT_IMPORT
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .filter(|target| !is_remote_reference(target) && !target.starts_with("sass:"))
            .map(|target| Specifier::classified(KIND, target))
            .collect();
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Css {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let target = specifier.value();
        let base = match target.strip_prefix('/') {
            Some(rooted) => ctx.project_root.join(rooted),
            None => ctx.current_dir().join(target.trim_start_matches('~')),
        };
        stylesheet_candidates(&base)
            .iter()
            .find_map(|candidate| existing_file(candidate))
    }
}

/// `dir/name` -> the file itself, `name.ext`, the Sass partial `_name.ext`,
/// then `name/index.ext` and `name/_index.ext`.
fn stylesheet_candidates(base: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![base.to_path_buf()];
    let (Some(dir), Some(name)) = (base.parent(), base.file_name().and_then(|n| n.to_str()))
    else {
        return candidates;
    };
    let partial = dir.join(format!("_{}", name));
    candidates.push(partial.clone());
    for ext in EXTENSIONS {
        candidates.push(with_suffix(base, ext));
        candidates.push(with_suffix(&partial, ext));
    }
    for ext in EXTENSIONS {
        candidates.push(base.join(format!("index{}", ext)));
        candidates.push(base.join(format!("_index{}", ext)));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_remote_and_builtin_modules() {
        let source = r#"
@import url("https://fonts.example.com/a.css");
@import 'reset.css';
@use "sass:math";
@use 'theme/colors' as c;
@forward "mixins";
"#;
        let found = Css.scan(source, &ScanContext { file: Path::new("main.scss") });
        let values: Vec<&str> = found.iter().map(Specifier::value).collect();
        assert_eq!(values, vec!["reset.css", "theme/colors", "mixins"]);
    }

    #[test]
    fn resolves_sass_partials() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("styles/theme")).unwrap();
        fs::write(root.join("styles/theme/_colors.scss"), "").unwrap();
        let current = root.join("styles/main.scss");
        let ctx = ResolutionContext {
            project_root: root,
            alias_config: None,
            config_base_path: None,
            current_file: &current,
        };
        let found = Css
            .resolve(&Specifier::classified(KIND, "theme/colors"), &ctx)
            .unwrap();
        assert!(found.ends_with("styles/theme/_colors.scss"));
    }
}
