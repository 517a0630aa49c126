use crate::ignore_rules::IgnoreMatcher;
use log;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates the files under `root`, pruning ignored directories before
/// descending into them.
///
/// A `root` that is itself a file is returned as-is without consulting the
/// matcher. Unreadable directories are logged and skipped; a missing root
/// yields nothing. Order follows the directory listing.
pub fn walk(root: &Path, matcher: &IgnoreMatcher) -> Vec<PathBuf> {
    if !root.exists() {
        log::error!("Input path does not exist: {}", root.display());
        return Vec::new();
    }
    if root.is_file() {
        log::trace!("Explicit file input: {}", root.display());
        return vec![root.to_path_buf()];
    }

    log::info!("Walking directory: {}", root.display());
    let mut files = Vec::new();
    let entries = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = entry.path();
            let Some(parent) = path.parent() else {
                return true;
            };
            let rules = matcher.rules_for_dir(parent);
            let is_dir = entry.file_type().is_dir();
            if matcher.matches(path, is_dir, &rules) {
                log::trace!("Pruned during walk: {}", path.display());
                return false;
            }
            true
        });

    for entry_result in entries {
        match entry_result {
            Ok(entry) => {
                let file_type = entry.file_type();
                let is_file =
                    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
                if is_file {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                log::warn!("Skipping unreadable path during walk: {}", e);
            }
        }
    }
    log::debug!("Walk of {} yielded {} file(s)", root.display(), files.len());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn relative_names(files: &[PathBuf], root: &Path) -> Vec<String> {
        let mut names: Vec<String> = files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn explicit_file_bypasses_ignore_checks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ignored.js");
        fs::write(&file, "").unwrap();
        let matcher = IgnoreMatcher::new(dir.path(), Some("ignored"), true, true).unwrap();
        assert_eq!(walk(&file, &matcher), vec![file]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = IgnoreMatcher::new(dir.path(), None, true, true).unwrap();
        assert!(walk(&dir.path().join("nope"), &matcher).is_empty());
    }

    #[test]
    fn prunes_by_pattern_and_scoped_ignore_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["src/ignored", "build", "packages/foo/dist", "packages/bar/dist"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join(".gitignore"), "build/\n").unwrap();
        fs::write(root.join("packages/foo/.gitignore"), "dist/\n").unwrap();
        fs::write(root.join("src/x.ts"), "").unwrap();
        fs::write(root.join("src/ignored/y.ts"), "").unwrap();
        fs::write(root.join("build/out.js"), "").unwrap();
        fs::write(root.join("packages/foo/dist/z.js"), "").unwrap();
        fs::write(root.join("packages/bar/dist/z.js"), "").unwrap();

        let matcher = IgnoreMatcher::new(root, Some("ignored"), true, false).unwrap();
        let files = walk(root, &matcher);
        assert_eq!(
            relative_names(&files, root),
            vec![
                ".gitignore",
                "packages/bar/dist/z.js",
                "packages/foo/.gitignore",
                "src/x.ts",
            ]
        );
    }

    #[test]
    fn walking_a_subdirectory_inherits_ancestor_rules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/generated")).unwrap();
        fs::write(root.join(".gitignore"), "generated/\n").unwrap();
        fs::write(root.join("app/main.py"), "").unwrap();
        fs::write(root.join("app/generated/g.py"), "").unwrap();

        let matcher = IgnoreMatcher::new(root, None, true, false).unwrap();
        let files = walk(&root.join("app"), &matcher);
        assert_eq!(relative_names(&files, root), vec!["app/main.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_does_not_hide_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("locked")).unwrap();
        fs::write(root.join("locked/secret.js"), "").unwrap();
        fs::write(root.join("open.js"), "").unwrap();
        fs::create_dir(root.join("lib")).unwrap();
        fs::write(root.join("lib/util.js"), "").unwrap();

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Permission bits do not bind a privileged user.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let matcher = IgnoreMatcher::new(root, None, true, false).unwrap();
        let files = walk(root, &matcher);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(relative_names(&files, root), vec!["lib/util.js", "open.js"]);
    }
}
