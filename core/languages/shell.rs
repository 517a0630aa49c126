use crate::languages::dedup;
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

const EXTENSIONS: &[&str] = &[".sh", ".bash", ".zsh"];
const KIND: &str = "source";

static SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:source|\.)[ \t]+["']?([^"'\s;|&]+)"#).expect("shell source regex")
});
// `$DIR/x`, `${DIR}/x` and `"$(dirname "$0")/x"` all point next to the script.
static SCRIPT_DIR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\$\{?\w+\}?|\$\(dirname[^)]*\))/"#).expect("script dir regex")
});

pub struct Shell;

impl LanguagePlugin for Shell {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let found = SOURCE
            .captures_iter(content)
            .filter_map(|c| {
                let target = &c[1];
                if let Some(found) = SCRIPT_DIR_PREFIX.find(target) {
                    return Some(format!("./{}", &target[found.end()..]));
                }
                // Other variable expansions cannot be followed statically.
                (!target.contains('$')).then(|| target.to_string())
            })
            .map(|target| Specifier::classified(KIND, target))
            .collect();
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Shell {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !specifier.is_kind(KIND) || !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        let target = specifier.value();
        existing_file(&ctx.current_dir().join(target))
            .or_else(|| existing_file(&ctx.project_root.join(target.trim_start_matches("./"))))
    }
}
