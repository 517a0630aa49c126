use crate::languages::{dedup, is_remote_reference};
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const EXTENSIONS: &[&str] = &["Dockerfile"];
const KIND: &str = "copy";

static COPY_OR_ADD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*(?:COPY|ADD)[ \t]+(.+)$").expect("copy regex"));

pub struct Dockerfile;

impl LanguagePlugin for Dockerfile {
    fn name(&self) -> &'static str {
        "dockerfile"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let mut found = Vec::new();
        for captures in COPY_OR_ADD.captures_iter(content) {
            let args: Vec<&str> = captures[1].split_whitespace().collect();
            // Files copied from another build stage are not on disk here.
            if args.iter().any(|a| a.starts_with("--from")) {
                continue;
            }
            let operands: Vec<&str> = args
                .into_iter()
                .filter(|a| !a.starts_with("--"))
                .collect();
            // The last operand is the destination.
            let Some((_, sources)) = operands.split_last() else {
                continue;
            };
            found.extend(
                sources
                    .iter()
                    .map(|s| s.trim_matches(|c| c == '"' || c == '\'' || c == '[' || c == ']' || c == ','))
                    .filter(|s| {
                        !s.is_empty()
                            && !s.contains(['*', '?', '$'])
                            && !is_remote_reference(s)
                    })
                    .map(|s| Specifier::classified(KIND, s)),
            );
        }
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Dockerfile {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        // Build context is the Dockerfile's directory; copied directories are not followed.
        existing_file(&ctx.current_dir().join(specifier.value().trim_start_matches('/')))
    }
}
