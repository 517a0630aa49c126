use log;
use std::path::{Path, PathBuf};

pub const VCS_MARKERS: &[&str] = &[".git", ".hg", ".svn"];

pub const PROJECT_MANIFESTS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
    "pyproject.toml",
    "setup.py",
    "composer.json",
    "pom.xml",
    "build.gradle",
    "Rakefile",
    "Makefile",
];

/// Finds the project root for `start_path`.
///
/// The nearest ancestor holding a version-control directory wins and stops
/// the search; otherwise the nearest ancestor with a project manifest;
/// otherwise the starting directory itself.
pub fn locate_project_root(start_path: &Path) -> PathBuf {
    let absolute = start_path
        .canonicalize()
        .or_else(|_| std::path::absolute(start_path))
        .unwrap_or_else(|_| start_path.to_path_buf());
    let start_dir = if absolute.is_file() {
        absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| absolute.clone())
    } else {
        absolute
    };

    let mut manifest_root: Option<PathBuf> = None;
    for dir in start_dir.ancestors() {
        if let Some(marker) = VCS_MARKERS.iter().find(|m| dir.join(m).is_dir()) {
            log::debug!(
                "Project root found via {} marker: {}",
                marker,
                dir.display()
            );
            return dir.to_path_buf();
        }
        if manifest_root.is_none() {
            if let Some(manifest) = PROJECT_MANIFESTS.iter().find(|m| dir.join(m).is_file()) {
                log::trace!("Manifest {} found in {}", manifest, dir.display());
                manifest_root = Some(dir.to_path_buf());
            }
        }
    }

    match manifest_root {
        Some(root) => {
            log::debug!("Project root found via manifest: {}", root.display());
            root
        }
        None => {
            log::debug!(
                "No project markers found, using start directory: {}",
                start_dir.display()
            );
            start_dir
        }
    }
}
