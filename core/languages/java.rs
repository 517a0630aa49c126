use crate::languages::{capture_all, dedup};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
    with_suffix,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const EXTENSIONS: &[&str] = &[".java", ".kt"];
const KIND: &str = "import";
const SOURCE_ROOTS: &[&str] = &["src/main/java", "src/main/kotlin", "src", "."];

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+)").expect("java import regex")
});

pub struct Java;

impl LanguagePlugin for Java {
    fn name(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        dedup(
            capture_all(&IMPORT, content)
                .into_iter()
                .map(|name| Specifier::classified(KIND, name.trim_end_matches('.')))
                .collect(),
        )
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Java {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let segments: Vec<&str> = specifier.value().split('.').collect();
        // Static and nested-type imports name a member; drop it and retry.
        let attempts = [&segments[..], &segments[..segments.len().saturating_sub(1)]];
        attempts
            .iter()
            .filter(|parts| !parts.is_empty())
            .find_map(|parts| class_file(ctx, parts))
    }
}

fn class_file(ctx: &ResolutionContext<'_>, parts: &[&str]) -> Option<PathBuf> {
    let relative = parts.join("/");
    SOURCE_ROOTS.iter().find_map(|root| {
        let base = ctx.project_root.join(root).join(&relative);
        EXTENSIONS
            .iter()
            .find_map(|ext| existing_file(&with_suffix(&base, ext)))
    })
}
