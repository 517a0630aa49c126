use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use xdeps_core::{
    DependencyGraphBuilder, DiscoveryEvent, DiscoveryOptions, IgnoreMatcher, LanguagePlugin,
    PluginRegistry, ResolutionContext, Resolver, ScanContext, Specifier, discover_from_inputs,
};

const NO_DEFAULT_EXCLUDE: Option<&str> = None;

struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        Self { _dir: dir, root }
    }

    fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn discover(
        &self,
        inputs: &[PathBuf],
        registry: &PluginRegistry,
        exclude: Option<&str>,
    ) -> xdeps_core::DiscoveryReport {
        let matcher = IgnoreMatcher::new(&self.root, exclude, true, true).unwrap();
        discover_from_inputs(inputs, registry, &matcher, DiscoveryOptions::default()).unwrap()
    }

    fn relative(&self, files: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(&self.root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        names.sort();
        names
    }
}

#[test]
fn relative_import_pulls_in_sibling() {
    let project = Project::new();
    let a = project.file("a.js", "import './b'\n");
    project.file("b.js", "export const b = 1;\n");

    let report = project.discover(&[a], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(project.relative(&report.sorted_files()), vec!["a.js", "b.js"]);
}

#[test]
fn unresolvable_require_is_dropped_silently() {
    let project = Project::new();
    let a = project.file("a.rb", "require 'foo'\n");

    let report = project.discover(&[a], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(project.relative(&report.sorted_files()), vec!["a.rb"]);
    assert!(report.events.iter().any(|e| matches!(
        e,
        DiscoveryEvent::Unresolved { specifier, .. } if specifier == "require:foo"
    )));
}

#[test]
fn excluded_paths_are_neither_walked_nor_followed() {
    let project = Project::new();
    project.file("src/x.ts", "import { y } from './ignored/y';\n");
    project.file("src/ignored/y.ts", "export const y = 2;\n");

    let report = project.discover(
        &[project.root.join("src")],
        &PluginRegistry::builtin(),
        Some("ignored"),
    );
    assert_eq!(project.relative(&report.sorted_files()), vec!["src/x.ts"]);
    assert_eq!(report.scan_count, 1);
    assert!(report.events.iter().any(|e| matches!(
        e,
        DiscoveryEvent::Excluded { path, .. } if path.ends_with("src/ignored/y.ts")
    )));
}

#[test]
fn nested_ignore_file_only_covers_its_subtree() {
    let project = Project::new();
    project.file(".gitignore", "build/\n");
    project.file("packages/foo/.gitignore", "dist/\n");
    project.file("build/out.js", "");
    project.file("packages/foo/dist/z.js", "");
    project.file("packages/bar/dist/z.js", "");
    project.file("packages/foo/index.js", "");

    let report = project.discover(
        &[project.root.join("packages")],
        &PluginRegistry::builtin(),
        NO_DEFAULT_EXCLUDE,
    );
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec![
            "packages/bar/dist/z.js",
            "packages/foo/.gitignore",
            "packages/foo/index.js",
        ]
    );
}

#[test]
fn shared_target_is_scanned_once() {
    let project = Project::new();
    let main = project.file("src/main.js", "import './a/one';\nimport './b/two';\n");
    project.file("src/a/one.js", "import '../shared/util';\n");
    project.file("src/b/two.js", "import '../shared/util.js';\n");
    project.file("src/shared/util.js", "export default 1;\n");

    let report = project.discover(&[main], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["src/a/one.js", "src/b/two.js", "src/main.js", "src/shared/util.js"]
    );
    let util_scans = report
        .events
        .iter()
        .filter(|e| matches!(e, DiscoveryEvent::Scanned { path, .. } if path.ends_with("shared/util.js")))
        .count();
    assert_eq!(util_scans, 1);
}

#[test]
fn import_cycles_terminate() {
    let project = Project::new();
    let a = project.file("a.py", "from . import b\n");
    project.file("b.py", "from . import a\n");
    project.file("__init__.py", "");

    let report = project.discover(&[a], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["__init__.py", "a.py", "b.py"]
    );
    assert_eq!(report.scan_count, 3);
}

#[test]
fn package_relative_import_ignores_same_named_sibling_file() {
    let project = Project::new();
    let a = project.file("pkg/a.py", "from . import b\n");
    project.file("pkg/__init__.py", "");
    project.file("pkg/b.py", "");
    project.file("pkg.js", "export default 1;\n");

    let report = project.discover(&[a], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["pkg/__init__.py", "pkg/a.py", "pkg/b.py"]
    );
}

#[test]
fn default_exclude_blocks_test_directories_even_when_referenced() {
    let project = Project::new();
    let app = project.file("lib/app.js", "const h = require('../tests/helper');\n");
    project.file("tests/helper.js", "");

    let report = project.discover(
        &[app],
        &PluginRegistry::builtin(),
        Some(xdeps_core::ignore_rules::DEFAULT_EXCLUDE_PATTERN),
    );
    assert_eq!(project.relative(&report.sorted_files()), vec!["lib/app.js"]);
}

/// Records how often each file is scanned and always references the same
/// two targets.
struct CountingPlugin {
    scans: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl LanguagePlugin for CountingPlugin {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".node"]
    }

    fn scan(&self, _content: &str, ctx: &ScanContext<'_>) -> Vec<Specifier> {
        *self
            .scans
            .lock()
            .unwrap()
            .entry(ctx.file.to_path_buf())
            .or_default() += 1;
        vec![Specifier::plain("./left"), Specifier::plain("./right")]
    }
}

#[test]
fn every_file_is_scanned_at_most_once() {
    let project = Project::new();
    for name in ["start", "left", "right"] {
        project.file(&format!("{}.node", name), "");
    }
    let scans = Arc::new(Mutex::new(HashMap::new()));
    let registry = PluginRegistry::load(vec![Arc::new(CountingPlugin {
        scans: Arc::clone(&scans),
    })]);

    let report = project.discover(
        &[project.root.join("start.node")],
        &registry,
        NO_DEFAULT_EXCLUDE,
    );
    assert_eq!(report.files.len(), 3);
    let scans = scans.lock().unwrap();
    assert_eq!(scans.len(), 3);
    assert!(scans.values().all(|count| *count == 1));
}

/// Resolves every specifier to a path next to the current file, whatever
/// that path turns out to be.
struct SiblingPlugin;

impl LanguagePlugin for SiblingPlugin {
    fn name(&self) -> &'static str {
        "sibling"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".refs"]
    }

    fn scan(&self, content: &str, _ctx: &ScanContext<'_>) -> Vec<Specifier> {
        content.lines().map(Specifier::plain).collect()
    }

    fn resolver(&self) -> Option<&dyn Resolver> {
        Some(self)
    }
}

impl Resolver for SiblingPlugin {
    fn resolve(&self, specifier: &Specifier, ctx: &ResolutionContext<'_>) -> Option<PathBuf> {
        Some(ctx.current_dir().join(specifier.value()))
    }
}

#[test]
fn resolver_returning_a_directory_is_reported_not_followed() {
    let project = Project::new();
    let start = project.file("start.refs", "assets\nother.refs\n");
    project.file("assets/logo.refs", "");
    project.file("other.refs", "");
    let registry = PluginRegistry::load(vec![Arc::new(SiblingPlugin)]);

    let report = project.discover(&[start], &registry, NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["other.refs", "start.refs"]
    );
    assert!(report.events.iter().any(|e| matches!(
        e,
        DiscoveryEvent::NotAFile { path, .. } if path.ends_with("assets")
    )));
}

#[cfg(unix)]
#[test]
fn unreadable_files_are_reported_and_discovery_finishes() {
    use std::os::unix::fs::PermissionsExt;

    let project = Project::new();
    let locked_seed = project.file("locked_seed.js", "import './never';\n");
    let main = project.file("main.js", "import './locked';\nimport './ok';\n");
    let locked = project.file("locked.js", "import './never';\n");
    project.file("ok.js", "import './leaf';\n");
    project.file("leaf.js", "");
    project.file("never.js", "");
    for path in [&locked_seed, &locked] {
        fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
    }
    // Permission bits do not bind a privileged user.
    if fs::read(&locked).is_ok() {
        return;
    }

    let registry = PluginRegistry::builtin();
    let matcher = IgnoreMatcher::new(&project.root, NO_DEFAULT_EXCLUDE, true, true).unwrap();
    let builder = DependencyGraphBuilder::new(&registry, &matcher, DiscoveryOptions::default());
    let mut seeding = Vec::new();
    let seeds = builder.seed_from_inputs(&[locked_seed, main], &mut seeding);
    assert!(seeding.is_empty());
    let report = builder.discover(seeds);

    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["leaf.js", "locked.js", "locked_seed.js", "main.js", "ok.js"]
    );
    let unreadable: Vec<&PathBuf> = report
        .events
        .iter()
        .filter_map(|e| match e {
            DiscoveryEvent::ReadFailed { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(unreadable.len(), 2);
    assert!(unreadable.iter().any(|p| p.ends_with("locked_seed.js")));
    assert!(unreadable.iter().any(|p| p.ends_with("locked.js")));
    assert_eq!(report.scan_count, 3);
}

#[test]
fn repeated_runs_find_the_same_set() {
    let project = Project::new();
    project.file("src/index.ts", "import { a } from './a';\nexport * from './b';\n");
    project.file("src/a.ts", "import './b';\n");
    project.file("src/b.tsx", "");

    let registry = PluginRegistry::builtin();
    let first = project.discover(&[project.root.join("src")], &registry, NO_DEFAULT_EXCLUDE);
    let second = project.discover(&[project.root.join("src")], &registry, NO_DEFAULT_EXCLUDE);
    assert_eq!(first.sorted_files(), second.sorted_files());
    assert_eq!(first.files.len(), 3);
}

#[test]
fn tsconfig_aliases_resolve_across_directories() {
    let project = Project::new();
    project.file(
        "tsconfig.json",
        r#"{
  // editor comment
  "compilerOptions": {
    "baseUrl": ".",
    "paths": { "@lib/*": ["lib/*"], },
  },
}"#,
    );
    let main = project.file("app/main.ts", "import { fmt } from '@lib/format';\n");
    project.file("lib/format.ts", "export const fmt = 1;\n");

    let report = project.discover(&[main], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["app/main.ts", "lib/format.ts"]
    );
}

#[test]
fn base_url_without_paths_resolves_bare_specifiers() {
    let project = Project::new();
    project.file("tsconfig.json", r#"{"compilerOptions":{"baseUrl":"src"}}"#);
    let main = project.file("src/main.ts", "import { fmt } from 'utils/format';\n");
    project.file("src/utils/format.ts", "export const fmt = 1;\n");

    let report = project.discover(&[main], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(
        project.relative(&report.sorted_files()),
        vec!["src/main.ts", "src/utils/format.ts"]
    );
}

#[cfg(unix)]
#[test]
fn symlinked_alias_is_deduplicated() {
    let project = Project::new();
    let main = project.file("main.js", "import './real';\nimport './alias';\n");
    let real = project.file("real.js", "");
    std::os::unix::fs::symlink(&real, project.root.join("alias.js")).unwrap();

    let report = project.discover(&[main], &PluginRegistry::builtin(), NO_DEFAULT_EXCLUDE);
    assert_eq!(project.relative(&report.sorted_files()), vec!["main.js", "real.js"]);
}
