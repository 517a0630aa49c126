use indexmap::IndexMap;
use log;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const ALIAS_CONFIG_FILENAMES: &[&str] = &["tsconfig.json", "jsconfig.json"];

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"));
static PATHS_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""paths"\s*:\s*\{"#).expect("paths key regex"));
static BASE_URL_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""baseUrl"\s*:\s*"([^"]*)""#).expect("baseUrl regex"));

/// Path mappings read from a `tsconfig.json`-style file. Either `baseUrl`
/// or a non-empty `paths` map is present.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasConfig {
    pub config_path: PathBuf,
    /// Explicit `baseUrl`, already joined onto the config directory.
    pub base_url: Option<PathBuf>,
    pub paths: IndexMap<String, Vec<String>>,
}

impl AliasConfig {
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or(Path::new("."))
    }

    /// Directory that `paths` targets are relative to: `baseUrl` when set,
    /// else the directory holding the config file.
    pub fn target_base(&self) -> &Path {
        self.base_url.as_deref().unwrap_or_else(|| self.config_dir())
    }

    /// Expands `specifier` through every matching mapping, in declaration
    /// order. Targets come back unjoined; callers anchor them on
    /// [`AliasConfig::target_base`] and probe extensions.
    pub fn expand(&self, specifier: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        for (pattern, targets) in &self.paths {
            if let Some(prefix) = pattern.strip_suffix('*') {
                let Some(rest) = specifier.strip_prefix(prefix) else {
                    continue;
                };
                for target in targets {
                    let expanded = match target.strip_suffix('*') {
                        Some(target_prefix) => format!("{}{}", target_prefix, rest),
                        None => target.clone(),
                    };
                    candidates.push(expanded);
                }
            } else if specifier == pattern {
                candidates.extend(targets.iter().cloned());
            }
        }
        candidates
    }
}

/// Loads the alias configuration nearest to `hint_file`, never looking above
/// `project_root`, and falling back to one at the project root.
pub fn load_alias_config(project_root: &Path, hint_file: &Path) -> Option<AliasConfig> {
    let config_path = find_alias_config_file(project_root, hint_file)?;
    let content = match fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!(
                "Failed to read alias config {}: {}",
                config_path.display(),
                e
            );
            return None;
        }
    };
    let parsed = parse_alias_config(&content, &config_path);
    if parsed.is_none() {
        log::debug!(
            "No usable path mappings in {}, continuing without aliases.",
            config_path.display()
        );
    }
    parsed
}

pub fn find_alias_config_file(project_root: &Path, hint_file: &Path) -> Option<PathBuf> {
    let start = if hint_file.is_dir() {
        Some(hint_file)
    } else {
        hint_file.parent()
    };
    if let Some(start) = start.filter(|s| s.starts_with(project_root)) {
        for dir in start.ancestors() {
            if let Some(found) = config_file_in(dir) {
                return Some(found);
            }
            if dir == project_root {
                break;
            }
        }
    }
    config_file_in(project_root)
}

fn config_file_in(dir: &Path) -> Option<PathBuf> {
    ALIAS_CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Tolerant parse: strict JSON after comment stripping, then with trailing
/// commas removed, then salvaging only the `paths` object.
pub fn parse_alias_config(content: &str, config_path: &Path) -> Option<AliasConfig> {
    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    let stripped = strip_jsonc_comments(content);

    let parsed: Option<Value> = serde_json::from_str(&stripped).ok().or_else(|| {
        log::trace!(
            "Retrying {} without trailing commas",
            config_path.display()
        );
        serde_json::from_str(&TRAILING_COMMA.replace_all(&stripped, "$1")).ok()
    });

    let (base_url, paths_value) = match parsed {
        Some(root) => {
            let compiler = root.get("compilerOptions")?;
            let base_url = compiler
                .get("baseUrl")
                .and_then(Value::as_str)
                .map(str::to_string);
            (base_url, compiler.get("paths").cloned())
        }
        None => {
            log::debug!(
                "Alias config {} is not valid JSON, salvaging the paths section",
                config_path.display()
            );
            salvage_paths_section(&stripped)?
        }
    };

    let paths = paths_value
        .as_ref()
        .map(paths_from_value)
        .unwrap_or_default();
    if base_url.is_none() && paths.is_empty() {
        return None;
    }
    let base_url = base_url.map(|b| config_dir.join(b));
    Some(AliasConfig {
        config_path: config_path.to_path_buf(),
        base_url,
        paths,
    })
}

fn paths_from_value(value: &Value) -> IndexMap<String, Vec<String>> {
    let Some(object) = value.as_object() else {
        return IndexMap::new();
    };
    object
        .iter()
        .map(|(pattern, targets)| {
            let targets = match targets {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                Value::String(single) => vec![single.clone()],
                _ => Vec::new(),
            };
            (pattern.clone(), targets)
        })
        .filter(|(_, targets)| !targets.is_empty())
        .collect()
}

fn salvage_paths_section(stripped: &str) -> Option<(Option<String>, Option<Value>)> {
    let key = PATHS_KEY.find(stripped)?;
    let open = key.end() - 1;
    let close = matching_brace(stripped, open)?;
    let section = TRAILING_COMMA.replace_all(&stripped[open..=close], "$1");
    let value: Value = serde_json::from_str(&section).ok()?;
    let base_url = BASE_URL_KEY
        .captures(stripped)
        .map(|c| c[1].to_string());
    Some((base_url, Some(value)))
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strips `//` and `/* */` comments while leaving string contents alone.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                out.push(ch);
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for c in chars.by_ref() {
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Memoizes alias lookups per directory for the length of one run.
#[derive(Debug, Default)]
pub struct AliasCache {
    by_dir: HashMap<PathBuf, Option<Rc<AliasConfig>>>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_file(&mut self, project_root: &Path, file: &Path) -> Option<Rc<AliasConfig>> {
        let dir = file.parent().unwrap_or(project_root).to_path_buf();
        self.by_dir
            .entry(dir)
            .or_insert_with(|| load_alias_config(project_root, file).map(Rc::new))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_but_not_strings() {
        let input = r#"{ "a": "http://x", // note
        /* block */ "b": 1 }"#;
        let out = strip_jsonc_comments(input);
        assert!(out.contains("http://x"));
        assert!(!out.contains("note"));
        assert!(!out.contains("block"));
    }

    #[test]
    fn parses_jsonc_with_trailing_commas() {
        let content = r#"{
            // comment
            "compilerOptions": {
                "baseUrl": "./src",
                "paths": { "@app/*": ["app/*"], },
            },
        }"#;
        let config = parse_alias_config(content, Path::new("/proj/tsconfig.json")).unwrap();
        assert_eq!(config.base_url, Some(PathBuf::from("/proj/./src")));
        assert_eq!(config.target_base(), Path::new("/proj/./src"));
        assert_eq!(config.paths["@app/*"], vec!["app/*".to_string()]);
        assert_eq!(config.expand("@app/widgets/button"), vec!["app/widgets/button"]);
    }

    #[test]
    fn base_url_alone_is_a_usable_config() {
        let config = parse_alias_config(
            r#"{"compilerOptions":{"baseUrl":"src"}}"#,
            Path::new("/proj/tsconfig.json"),
        )
        .unwrap();
        assert!(config.paths.is_empty());
        assert_eq!(config.target_base(), Path::new("/proj/src"));
        assert!(config.expand("utils/format").is_empty());
    }

    #[test]
    fn paths_without_base_url_anchor_on_config_dir() {
        let config = parse_alias_config(
            r#"{"compilerOptions":{"paths":{"~/*":["lib/*"]}}}"#,
            Path::new("/proj/web/tsconfig.json"),
        )
        .unwrap();
        assert_eq!(config.base_url, None);
        assert_eq!(config.target_base(), Path::new("/proj/web"));
    }

    #[test]
    fn salvages_paths_from_broken_file() {
        let content = r#"{
            "compilerOptions": {
                "baseUrl": ".",
                "paths": { "~/*": ["src/*"] }
                "strict": true oops
            }
        }"#;
        let config = parse_alias_config(content, Path::new("/proj/tsconfig.json")).unwrap();
        assert_eq!(config.paths["~/*"], vec!["src/*".to_string()]);
    }

    #[test]
    fn total_failure_degrades_to_none() {
        assert!(parse_alias_config("not json at all", Path::new("/p/tsconfig.json")).is_none());
        assert!(parse_alias_config(r#"{"compilerOptions":{}}"#, Path::new("/p/t.json")).is_none());
    }

    #[test]
    fn nearest_config_wins_over_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let pkg = root.join("packages").join("web");
        std::fs::create_dir_all(pkg.join("src")).unwrap();
        std::fs::write(root.join("tsconfig.json"), "{}").unwrap();
        std::fs::write(pkg.join("tsconfig.json"), "{}").unwrap();

        let found = find_alias_config_file(root, &pkg.join("src").join("main.ts")).unwrap();
        assert_eq!(found, pkg.join("tsconfig.json"));

        let outside = tempfile::tempdir().unwrap();
        let fallback = find_alias_config_file(root, &outside.path().join("x.ts")).unwrap();
        assert_eq!(fallback, root.join("tsconfig.json"));
    }
}
