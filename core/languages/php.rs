use crate::languages::dedup;
use crate::plugin::{
    LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier, existing_file,
    is_relative_reference,
};
use log;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &[".php", ".blade.php"];

static INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:require|include)(?:_once)?\s*\(?\s*(__DIR__\s*\.\s*)?["']([^"'\n]+)["']"#)
        .expect("php include regex")
});
static USE_NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*use[ \t]+\\?([A-Za-z_][\w\\]*)(?:[ \t]+as[ \t]+\w+)?[ \t]*;")
        .expect("php use regex")
});

pub struct Php;

impl LanguagePlugin for Php {
    fn name(&self) -> &'static str {
        "php"
    }

    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        let mut found = Vec::new();
        for captures in INCLUDE.captures_iter(content) {
            let target = &captures[2];
            if captures.get(1).is_some() {
                found.push(Specifier::classified(
                    "include",
                    format!("./{}", target.trim_start_matches('/')),
                ));
            } else {
                found.push(Specifier::classified("include", target));
            }
        }
        for captures in USE_NAMESPACE.captures_iter(content) {
            found.push(Specifier::classified("namespace", &captures[1]));
        }
        dedup(found)
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for Php {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        if !ctx.current_file_matches(EXTENSIONS) {
            return None;
        }
        match specifier.kind()? {
            "include" => {
                let target = specifier.value();
                let from_current = existing_file(&ctx.current_dir().join(target));
                if from_current.is_some() || is_relative_reference(target) {
                    return from_current;
                }
                existing_file(&ctx.project_root.join(target.trim_start_matches('/')))
            }
            "namespace" => resolve_class(specifier.value(), ctx.project_root),
            _ => None,
        }
    }
}

/// PSR-4 prefixes from `composer.json`, longest first.
fn psr4_prefixes(project_root: &Path) -> Vec<(String, Vec<PathBuf>)> {
    let Ok(raw) = fs::read_to_string(project_root.join("composer.json")) else {
        return Vec::new();
    };
    let manifest: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Ignoring unparsable composer.json: {}", e);
            return Vec::new();
        }
    };
    let mut prefixes = Vec::new();
    for section in ["autoload", "autoload-dev"] {
        let Some(map) = manifest[section]["psr-4"].as_object() else {
            continue;
        };
        for (prefix, dirs) in map {
            let dirs: Vec<PathBuf> = match dirs {
                Value::String(dir) => vec![project_root.join(dir)],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|dir| project_root.join(dir))
                    .collect(),
                _ => continue,
            };
            prefixes.push((prefix.clone(), dirs));
        }
    }
    prefixes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
    prefixes
}

fn resolve_class(class: &str, project_root: &Path) -> Option<PathBuf> {
    for (prefix, dirs) in psr4_prefixes(project_root) {
        let Some(rest) = class.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let relative = format!("{}.php", rest.trim_start_matches('\\').replace('\\', "/"));
        if let Some(found) = dirs.iter().find_map(|dir| existing_file(&dir.join(&relative))) {
            return Some(found);
        }
    }

    let relative = class.replace('\\', "/");
    let without_vendor = relative.split_once('/').map(|(_, rest)| rest);
    let mut candidates = vec![
        project_root.join("src").join(format!("{}.php", relative)),
        project_root.join(format!("{}.php", relative)),
    ];
    if let Some(rest) = without_vendor {
        candidates.push(project_root.join("src").join(format!("{}.php", rest)));
        candidates.push(project_root.join("app").join(format!("{}.php", rest)));
    }
    candidates.iter().find_map(|c| existing_file(c))
}
