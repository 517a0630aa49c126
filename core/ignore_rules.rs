use crate::error::{AppError, Result};
use crate::output_formats::get_builtin_ignore_patterns;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log;
use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

pub const IGNORE_FILENAME: &str = ".gitignore";
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"(^|/)(node_modules|tests?|__tests__|spec)(/|$)";

/// One compiled line of an ignore file, scoped to the directory holding it.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub source: String,
    pub dir_only: bool,
    pub negated: bool,
    regex: Regex,
}

impl IgnoreRule {
    /// `relative_path` uses `/` separators and is relative to the project root.
    pub fn is_match(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.negated {
            return false;
        }
        let Some(captures) = self.regex.captures(relative_path) else {
            return false;
        };
        // A directory-only rule matches a plain file only when the file sits
        // beneath the matched directory.
        !self.dir_only || is_dir || captures.name("rest").is_some()
    }
}

/// Compiles one ignore-file line. `relative_dir` is the ignore file's
/// directory relative to the project root (empty for the root itself).
pub fn compile_ignore_line(line: &str, relative_dir: &str) -> Option<IgnoreRule> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (negated, body) = match trimmed.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (dir_only, body) = match body.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let (rooted, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    if body.is_empty() {
        return None;
    }

    let pattern = glob_to_regex_body(body);
    let prefix = if relative_dir.is_empty() {
        String::new()
    } else {
        format!("{}/", regex::escape(relative_dir))
    };
    let anchored = if rooted {
        format!("^{}{}(?P<rest>/.*)?$", prefix, pattern)
    } else {
        format!("^{}(?:.*/)?(?:{})(?P<rest>/.*)?$", prefix, pattern)
    };

    match Regex::new(&anchored) {
        Ok(regex) => Some(IgnoreRule {
            source: trimmed.to_string(),
            dir_only,
            negated,
            regex,
        }),
        Err(e) => {
            log::warn!("Skipping ignore pattern '{}': {}", trimmed, e);
            None
        }
    }
}

fn glob_to_regex_body(glob: &str) -> String {
    regex::escape(glob)
        .replace(r"\*\*/", "(?:.*/)?")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]")
}

pub fn parse_ignore_file(content: &str, relative_dir: &str) -> Vec<IgnoreRule> {
    let rules: Vec<IgnoreRule> = content
        .lines()
        .filter_map(|line| compile_ignore_line(line, relative_dir))
        .collect();
    let negations = rules.iter().filter(|r| r.negated).count();
    if negations > 0 {
        log::debug!(
            "Ignoring {} negation rule(s) in '{}/{}' (negation is not applied)",
            negations,
            relative_dir,
            IGNORE_FILENAME
        );
    }
    rules
}

/// Global exclusion regex, matched case-insensitively against root-relative paths.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    regex: Regex,
}

impl ExcludePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| AppError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.regex.is_match(relative_path)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Decides whether paths are excluded from the walk and from discovery.
///
/// Ignore-file rules are loaded lazily per directory and cached for the run;
/// a directory's effective rule set is its ancestors' rules (down to the
/// project root) followed by its own.
#[derive(Debug)]
pub struct IgnoreMatcher {
    project_root: PathBuf,
    exclude: Option<ExcludePattern>,
    builtin: Option<GlobSet>,
    use_ignore_files: bool,
    rules_by_dir: RefCell<HashMap<PathBuf, Rc<Vec<IgnoreRule>>>>,
}

impl IgnoreMatcher {
    pub fn new(
        project_root: &Path,
        exclude_pattern: Option<&str>,
        use_ignore_files: bool,
        use_builtin: bool,
    ) -> Result<Self> {
        let exclude = match exclude_pattern.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Some(ExcludePattern::new(pattern)?),
            None => None,
        };
        let builtin = if use_builtin {
            Some(build_builtin_glob_set()?)
        } else {
            None
        };
        log::debug!(
            "Ignore matcher ready (exclude: {:?}, ignore files: {}, builtin: {})",
            exclude.as_ref().map(ExcludePattern::as_str),
            use_ignore_files,
            use_builtin
        );
        Ok(Self {
            project_root: project_root.to_path_buf(),
            exclude,
            builtin,
            use_ignore_files,
            rules_by_dir: RefCell::new(HashMap::new()),
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Root-relative form with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let relative = pathdiff::diff_paths(path, &self.project_root)
            .unwrap_or_else(|| path.to_path_buf());
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect();
        parts.join("/")
    }

    /// The rule set in force for entries of `dir`.
    pub fn rules_for_dir(&self, dir: &Path) -> Rc<Vec<IgnoreRule>> {
        if !self.use_ignore_files {
            return Rc::new(Vec::new());
        }
        if let Some(cached) = self.rules_by_dir.borrow().get(dir) {
            return Rc::clone(cached);
        }

        let mut rules = match dir.parent() {
            Some(parent) if dir != self.project_root && dir.starts_with(&self.project_root) => {
                self.rules_for_dir(parent).as_ref().clone()
            }
            _ => Vec::new(),
        };
        rules.extend(self.load_local_rules(dir));

        let rules = Rc::new(rules);
        self.rules_by_dir
            .borrow_mut()
            .insert(dir.to_path_buf(), Rc::clone(&rules));
        rules
    }

    fn load_local_rules(&self, dir: &Path) -> Vec<IgnoreRule> {
        let ignore_file = dir.join(IGNORE_FILENAME);
        if !ignore_file.is_file() {
            return Vec::new();
        }
        match fs::read_to_string(&ignore_file) {
            Ok(content) => {
                let rules = parse_ignore_file(&content, &self.relative(dir));
                log::debug!(
                    "Loaded {} ignore rule(s) from {}",
                    rules.len(),
                    ignore_file.display()
                );
                rules
            }
            Err(e) => {
                log::warn!("Could not read {}: {}", ignore_file.display(), e);
                Vec::new()
            }
        }
    }

    /// True when the global exclude pattern, the built-in globs, or any of
    /// `rules` match `path`.
    pub fn matches(&self, path: &Path, is_dir: bool, rules: &[IgnoreRule]) -> bool {
        let relative = self.relative(path);
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(&relative) {
                log::trace!("Excluded by pattern: {}", relative);
                return true;
            }
        }
        if let Some(builtin) = &self.builtin {
            let dir_probe = format!("{}/dummy_file_for_dir_match", relative);
            if builtin.is_match(&relative) || (is_dir && builtin.is_match(&dir_probe)) {
                log::trace!("Excluded by built-in ignores: {}", relative);
                return true;
            }
        }
        if let Some(rule) = rules.iter().find(|r| r.is_match(&relative, is_dir)) {
            log::trace!("Excluded by ignore rule '{}': {}", rule.source, relative);
            return true;
        }
        false
    }

    /// Full check for a path that did not come from the walk: the path and
    /// every ancestor directory below the project root are tested against
    /// the rules in force for their parent.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Ok(below_root) = path.strip_prefix(&self.project_root) else {
            return self.matches(path, path.is_dir(), &[]);
        };
        let mut current = self.project_root.clone();
        let components: Vec<_> = below_root.components().collect();
        for (index, component) in components.iter().enumerate() {
            let parent = current.clone();
            current.push(component.as_os_str());
            let is_dir = index + 1 < components.len() || current.is_dir();
            let rules = self.rules_for_dir(&parent);
            if self.matches(&current, is_dir, &rules) {
                return true;
            }
        }
        false
    }
}

fn build_builtin_glob_set() -> Result<GlobSet> {
    let patterns = get_builtin_ignore_patterns();
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.directories.iter().chain(patterns.files.iter()) {
        let mut processed = pattern.trim().to_string();
        if processed.ends_with('/') && processed.len() > 1 {
            processed.push_str("**");
        }
        let glob = Glob::new(&processed).map_err(|e| {
            AppError::Glob(format!(
                "Invalid built-in glob pattern \"{}\" (processed as \"{}\"): {}",
                pattern, processed, e
            ))
        })?;
        builder.add(glob);
    }
    builder.build().map_err(AppError::from)
}
