use crate::languages::{capture_all, dedup, is_remote_reference};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const EXTENSIONS: &[&str] = &[".html", ".htm"];
const KIND: &str = "asset";

static SCRIPT_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("script src regex")
});
static LINK_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("link href regex")
});

pub struct Html;

impl LanguagePlugin for Html {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let found = capture_all(&SCRIPT_SRC, content)
            .into_iter()
            .chain(capture_all(&LINK_HREF, content))
            .filter(|target| !is_remote_reference(target) && !target.starts_with('#'))
            .map(|target| Specifier::classified(KIND, target))
            .collect();
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Html {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let target = specifier
            .value()
            .split(['?', '#'])
            .next()
            .filter(|t| !t.is_empty())?;
        let path = match target.strip_prefix('/') {
            Some(rooted) => ctx.project_root.join(rooted),
            None => ctx.current_dir().join(target),
        };
        existing_file(&path)
    }
}
