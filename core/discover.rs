use crate::alias::{AliasCache, AliasConfig};
use crate::error::{AppError, Result};
use crate::ignore_rules::IgnoreMatcher;
use crate::plugin::{ResolutionContext, ScanContext, Specifier, normalize_path, with_suffix};
use crate::registry::PluginRegistry;
use crate::walker;
use indexmap::IndexSet;
use log;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

/// Something the engine did, recorded in order alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    MissingInput {
        path: PathBuf,
    },
    Seeded {
        path: PathBuf,
        recognized: bool,
    },
    Scanned {
        path: PathBuf,
        plugin: String,
        specifiers: usize,
    },
    Resolved {
        from: PathBuf,
        specifier: String,
        to: PathBuf,
        via: String,
    },
    Unresolved {
        from: PathBuf,
        specifier: String,
    },
    Excluded {
        from: PathBuf,
        path: PathBuf,
    },
    NotAFile {
        from: PathBuf,
        path: PathBuf,
    },
    ReadFailed {
        path: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Seeds first, then discovered files in BFS order.
    pub files: IndexSet<PathBuf>,
    pub events: Vec<DiscoveryEvent>,
    pub scan_count: usize,
}

impl DiscoveryReport {
    pub fn sorted_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.files.iter().cloned().collect();
        files.sort();
        files
    }

    pub fn unresolved_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::Unresolved { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// Resolve symlinks so aliases of one file share an identity.
    pub canonicalize_paths: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            canonicalize_paths: true,
        }
    }
}

/// Breadth-first expansion from seed files along resolved references.
pub struct DependencyGraphBuilder<'a> {
    registry: &'a PluginRegistry,
    matcher: &'a IgnoreMatcher,
    options: DiscoveryOptions,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(
        registry: &'a PluginRegistry,
        matcher: &'a IgnoreMatcher,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            registry,
            matcher,
            options,
        }
    }

    fn project_root(&self) -> &Path {
        self.matcher.project_root()
    }

    /// Absolute, normalized identity of `path`.
    pub fn identity(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::path::absolute(path).unwrap_or_else(|_| self.project_root().join(path))
        };
        if self.options.canonicalize_paths {
            if let Ok(canonical) = fs::canonicalize(&absolute) {
                return canonical;
            }
        }
        normalize_path(&absolute)
    }

    /// Walks every input and returns the distinct seed files in walk order.
    /// Inputs that do not exist are reported and skipped.
    pub fn seed_from_inputs(
        &self,
        inputs: &[PathBuf],
        events: &mut Vec<DiscoveryEvent>,
    ) -> IndexSet<PathBuf> {
        let mut seeds = IndexSet::new();
        for input in inputs {
            let input = self.identity(input);
            if !input.exists() {
                log::error!("Input path not found: {}", input.display());
                events.push(DiscoveryEvent::MissingInput { path: input });
                continue;
            }
            for file in walker::walk(&input, self.matcher) {
                seeds.insert(self.identity(&file));
            }
        }
        log::info!("Collected {} seed file(s)", seeds.len());
        seeds
    }

    pub fn discover(&self, seeds: IndexSet<PathBuf>) -> DiscoveryReport {
        self.discover_with_events(seeds, Vec::new())
    }

    fn discover_with_events(
        &self,
        seeds: IndexSet<PathBuf>,
        mut events: Vec<DiscoveryEvent>,
    ) -> DiscoveryReport {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut files: IndexSet<PathBuf> = IndexSet::new();
        let mut aliases = AliasCache::new();
        let mut scan_count = 0;

        for seed in seeds {
            let recognized = self.registry.is_recognized(&seed);
            if recognized {
                visited.insert(seed.clone());
            } else {
                log::trace!("Seed has no plugin and will not be scanned: {}", seed.display());
            }
            events.push(DiscoveryEvent::Seeded {
                path: seed.clone(),
                recognized,
            });
            files.insert(seed.clone());
            queue.push_back(seed);
        }

        while let Some(current) = queue.pop_front() {
            let Some(plugin) = self.registry.plugin_for(&current) else {
                continue;
            };
            let content = match fs::read(&current) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    log::warn!("Could not read {}: {}", current.display(), e);
                    events.push(DiscoveryEvent::ReadFailed {
                        path: current.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let specifiers = plugin.scan(&content, &ScanContext { file: &current });
            scan_count += 1;
            log::debug!(
                "Scanned {} with {}: {} reference(s)",
                current.display(),
                plugin.name(),
                specifiers.len()
            );
            events.push(DiscoveryEvent::Scanned {
                path: current.clone(),
                plugin: plugin.name().to_string(),
                specifiers: specifiers.len(),
            });

            let alias_config = aliases.for_file(self.project_root(), &current);
            let ctx = ResolutionContext {
                project_root: self.project_root(),
                alias_config: alias_config.as_deref(),
                config_base_path: alias_config.as_deref().map(AliasConfig::target_base),
                current_file: &current,
            };

            for specifier in &specifiers {
                let Some((resolved, via)) = self.resolve(specifier, &ctx) else {
                    log::trace!("Unresolved in {}: {}", current.display(), specifier);
                    events.push(DiscoveryEvent::Unresolved {
                        from: current.clone(),
                        specifier: specifier.to_string(),
                    });
                    continue;
                };
                let target = self.identity(&resolved);

                if self.matcher.is_ignored(&target) {
                    log::trace!("Resolved path is excluded: {}", target.display());
                    events.push(DiscoveryEvent::Excluded {
                        from: current.clone(),
                        path: target,
                    });
                    continue;
                }
                if visited.contains(&target) {
                    continue;
                }
                if !fs::metadata(&target).is_ok_and(|m| m.is_file()) {
                    log::debug!("Resolved path is not a regular file: {}", target.display());
                    events.push(DiscoveryEvent::NotAFile {
                        from: current.clone(),
                        path: target,
                    });
                    continue;
                }

                log::trace!(
                    "{} -> {} (via {})",
                    specifier,
                    target.display(),
                    via
                );
                events.push(DiscoveryEvent::Resolved {
                    from: current.clone(),
                    specifier: specifier.to_string(),
                    to: target.clone(),
                    via,
                });
                visited.insert(target.clone());
                files.insert(target.clone());
                queue.push_back(target);
            }
        }

        log::info!(
            "Discovery finished: {} file(s), {} scan(s)",
            files.len(),
            scan_count
        );
        DiscoveryReport {
            files,
            events,
            scan_count,
        }
    }

    /// Relative fast path first, then each plugin resolver in registration
    /// order. Returns the path and what resolved it.
    fn resolve(
        &self,
        specifier: &Specifier,
        ctx: &ResolutionContext<'_>,
    ) -> Option<(PathBuf, String)> {
        if specifier.is_relative() {
            if let Some(found) = self.probe_relative(specifier.value(), ctx.current_dir()) {
                return Some((found, "relative".to_string()));
            }
        }
        self.registry.resolvers().iter().find_map(|plugin| {
            let found = plugin.resolver()?.resolve(specifier, ctx)?;
            Some((found, plugin.name().to_string()))
        })
    }

    /// The exact path, then `<base><ext>` for every registered extension.
    fn probe_relative(&self, value: &str, dir: &Path) -> Option<PathBuf> {
        let base = normalize_path(&dir.join(value));
        if base.is_file() {
            return Some(base);
        }
        self.registry
            .probe_extensions()
            .map(|ext| with_suffix(&base, ext))
            .find(|candidate| candidate.is_file())
    }
}

/// Seeds from `inputs` and runs discovery.
///
/// Fails only when none of the inputs exist.
pub fn discover_from_inputs(
    inputs: &[PathBuf],
    registry: &PluginRegistry,
    matcher: &IgnoreMatcher,
    options: DiscoveryOptions,
) -> Result<DiscoveryReport> {
    let builder = DependencyGraphBuilder::new(registry, matcher, options);
    let mut events = Vec::new();
    let seeds = builder.seed_from_inputs(inputs, &mut events);

    let missing = events
        .iter()
        .filter(|e| matches!(e, DiscoveryEvent::MissingInput { .. }))
        .count();
    if !inputs.is_empty() && missing == inputs.len() {
        let names: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
        return Err(AppError::NoSeedFiles(names.join(", ")));
    }
    Ok(builder.discover_with_events(seeds, events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        (dir, root)
    }

    #[test]
    fn relative_probe_follows_registry_order() {
        let (_dir, root) = fixture();
        fs::write(root.join("a.js"), "import './b';\n").unwrap();
        fs::write(root.join("b.ts"), "").unwrap();
        fs::write(root.join("b.js"), "").unwrap();
        let registry = PluginRegistry::builtin();
        let matcher = IgnoreMatcher::new(&root, None, true, true).unwrap();
        let report = discover_from_inputs(
            &[root.join("a.js")],
            &registry,
            &matcher,
            DiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(report.sorted_files(), vec![root.join("a.js"), root.join("b.js")]);
    }

    #[test]
    fn all_inputs_missing_is_an_error() {
        let (_dir, root) = fixture();
        let registry = PluginRegistry::builtin();
        let matcher = IgnoreMatcher::new(&root, None, true, true).unwrap();
        let result = discover_from_inputs(
            &[root.join("missing.js")],
            &registry,
            &matcher,
            DiscoveryOptions::default(),
        );
        assert!(matches!(result, Err(AppError::NoSeedFiles(_))));
    }

    #[test]
    fn one_missing_input_is_reported_not_fatal() {
        let (_dir, root) = fixture();
        fs::write(root.join("main.py"), "").unwrap();
        let registry = PluginRegistry::builtin();
        let matcher = IgnoreMatcher::new(&root, None, true, true).unwrap();
        let report = discover_from_inputs(
            &[root.join("gone.py"), root.join("main.py")],
            &registry,
            &matcher,
            DiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(report.sorted_files(), vec![root.join("main.py")]);
        assert!(matches!(
            report.events[0],
            DiscoveryEvent::MissingInput { .. }
        ));
    }

    #[test]
    fn unrecognized_seed_is_kept_but_not_scanned() {
        let (_dir, root) = fixture();
        fs::write(root.join("notes.txt"), "import './x'").unwrap();
        fs::write(root.join("x.js"), "").unwrap();
        let registry = PluginRegistry::builtin();
        let matcher = IgnoreMatcher::new(&root, None, true, true).unwrap();
        let report = discover_from_inputs(
            &[root.join("notes.txt")],
            &registry,
            &matcher,
            DiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(report.sorted_files(), vec![root.join("notes.txt")]);
        assert_eq!(report.scan_count, 0);
    }

    #[test]
    fn directory_references_stay_unresolved() {
        let (_dir, root) = fixture();
        fs::create_dir(root.join("assets")).unwrap();
        fs::write(root.join("index.html"), r#"<link href="assets">"#).unwrap();
        let registry = PluginRegistry::builtin();
        let matcher = IgnoreMatcher::new(&root, None, true, true).unwrap();
        let report = discover_from_inputs(
            &[root.join("index.html")],
            &registry,
            &matcher,
            DiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.unresolved_count(), 1);
    }
}
