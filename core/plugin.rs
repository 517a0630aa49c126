use crate::alias::AliasConfig;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A reference extracted from a source file by a plugin's `scan`.
///
/// Plain references carry only the raw text; classified references also say
/// what kind of reference it is (`require`, `constant`, `stylesheet_import`,
/// ...) so that resolvers can pick a strategy without re-parsing the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Specifier {
    Plain(String),
    Classified { kind: String, value: String },
}

impl Specifier {
    pub fn plain(value: impl Into<String>) -> Self {
        Specifier::Plain(value.into())
    }

    pub fn classified(kind: &str, value: impl Into<String>) -> Self {
        Specifier::Classified {
            kind: kind.to_string(),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Specifier::Plain(value) => value,
            Specifier::Classified { value, .. } => value,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Specifier::Plain(_) => None,
            Specifier::Classified { kind, .. } => Some(kind),
        }
    }

    pub fn is_kind(&self, expected: &str) -> bool {
        self.kind() == Some(expected)
    }

    pub fn is_relative(&self) -> bool {
        is_relative_reference(self.value())
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Specifier::Plain(value) => write!(f, "{}", value),
            Specifier::Classified { kind, value } => write!(f, "{}:{}", kind, value),
        }
    }
}

/// True only for `./` and `../` prefixes. A bare `.` or `..` is left to
/// the language resolvers, which give it their own meaning.
pub fn is_relative_reference(value: &str) -> bool {
    value.starts_with("./") || value.starts_with("../")
}

/// Passed to every `scan` call.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub file: &'a Path,
}

/// Read-only bundle handed to every resolver call.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub project_root: &'a Path,
    pub alias_config: Option<&'a AliasConfig>,
    /// Directory alias targets are joined onto, set whenever
    /// `alias_config` is.
    pub config_base_path: Option<&'a Path>,
    pub current_file: &'a Path,
}

impl<'a> ResolutionContext<'a> {
    pub fn current_dir(&self) -> &'a Path {
        self.current_file.parent().unwrap_or(self.project_root)
    }

    /// True when the file being resolved from is owned by one of `extensions`.
    pub fn current_file_matches(&self, extensions: &[&str]) -> bool {
        let Some(file_name) = self.current_file.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        extensions
            .iter()
            .any(|ext| extension_matches(file_name, ext))
    }
}

/// A per-language reference extractor.
///
/// Extensions are written with their leading dot (`.ts`, `.d.ts`); entries
/// without a dot (`Dockerfile`) are pseudo-extensions naming extensionless
/// files by prefix.
pub trait LanguagePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn scan(&self, content: &str, ctx: &ScanContext<'_>) -> Vec<Specifier>;

    /// Plugins that can map specifiers to files expose themselves here and
    /// join the fallback resolver chain.
    fn resolver(&self) -> Option<&dyn Resolver> {
        None
    }
}

pub trait Resolver {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf>;
}

pub fn is_pseudo_extension(ext: &str) -> bool {
    !ext.starts_with('.')
}

pub fn extension_matches(file_name: &str, ext: &str) -> bool {
    if is_pseudo_extension(ext) {
        !file_name.contains('.') && file_name.starts_with(ext)
    } else {
        file_name.len() > ext.len() && file_name.ends_with(ext)
    }
}

pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut raw = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

pub fn existing_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        Some(normalize_path(path))
    } else {
        None
    }
}

/// Probes `base` as given, then `base<ext>` for each extension, then
/// `base/index<ext>`. Extensions carry their leading dot.
pub fn try_extensions(base: &Path, extensions: &[&str]) -> Option<PathBuf> {
    if let Some(found) = existing_file(base) {
        return Some(found);
    }
    for ext in extensions {
        if let Some(found) = existing_file(&with_suffix(base, ext)) {
            return Some(found);
        }
    }
    let index = base.join("index");
    extensions
        .iter()
        .find_map(|ext| existing_file(&with_suffix(&index, ext)))
}

/// Lexically removes `.` and resolves `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_and_plain_share_value() {
        let plain = Specifier::plain("./b");
        let tagged = Specifier::classified("require", "foo");
        assert_eq!(plain.value(), "./b");
        assert_eq!(tagged.value(), "foo");
        assert!(plain.is_relative());
        assert!(!tagged.is_relative());
        assert!(tagged.is_kind("require"));
        assert_eq!(tagged.to_string(), "require:foo");
    }

    #[test]
    fn bare_dots_are_not_relative_paths() {
        assert!(is_relative_reference("../lib"));
        assert!(!is_relative_reference("."));
        assert!(!is_relative_reference(".."));
        assert!(!is_relative_reference(".b"));
        assert!(!Specifier::classified("module", ".").is_relative());
    }

    #[test]
    fn extension_matching_handles_composite_and_pseudo() {
        assert!(extension_matches("types.d.ts", ".d.ts"));
        assert!(extension_matches("types.d.ts", ".ts"));
        assert!(!extension_matches(".ts", ".ts"));
        assert!(extension_matches("Dockerfile", "Dockerfile"));
        assert!(extension_matches("Dockerfile-dev", "Dockerfile"));
        assert!(!extension_matches("Dockerfile.prod", "Dockerfile"));
        assert!(!extension_matches("Gemfile.lock", "Gemfile"));
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d.js")),
            PathBuf::from("/a/b/d.js")
        );
    }

    #[test]
    fn try_extensions_prefers_exact_then_suffix_then_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.js"), "").unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib").join("index.ts"), "").unwrap();

        let found = try_extensions(&dir.path().join("b"), &[".ts", ".js"]).unwrap();
        assert!(found.ends_with("b.js"));
        let index = try_extensions(&dir.path().join("lib"), &[".ts", ".js"]).unwrap();
        assert!(index.ends_with("lib/index.ts"));
        assert!(try_extensions(&dir.path().join("missing"), &[".js"]).is_none());
    }
}
