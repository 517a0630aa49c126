use crate::output_formats::get_language_labels;
use crate::tree::{self, DirectoryTreeNode};
use log;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// One discovered file as it appears in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleFile {
    pub path: String,
    pub language: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDocument {
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<Vec<String>>,
    pub files: Vec<BundleFile>,
}

#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub project_name: String,
    pub include_tree: bool,
    pub include_project_root: bool,
    pub include_timestamp: bool,
}

/// `path` relative to `root` with `/` separators; paths outside the root
/// keep their absolute form.
pub fn relative_display(path: &Path, root: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return path.to_string_lossy().into_owned();
    };
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Fence label for a file: a bare-name entry (`Dockerfile`, `Gemfile`)
/// first, then the extension, then the raw extension itself.
pub fn language_label(path: &Path) -> String {
    let labels = get_language_labels();
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return "text".to_string();
    };
    if let Some(label) = labels.get(name) {
        return label.clone();
    }
    if !name.contains('.') {
        if let Some(label) = labels
            .iter()
            .filter(|(key, _)| key.starts_with(char::is_uppercase) && name.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, label)| label)
        {
            return label.clone();
        }
        return "text".to_string();
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => labels.get(ext).cloned().unwrap_or_else(|| ext.to_string()),
        None => "text".to_string(),
    }
}

/// Three backticks, or one more than the longest backtick run in `content`.
pub fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in content.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

#[cfg(feature = "serde_support")]
fn timestamp_now() -> Option<String> {
    Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

#[cfg(not(feature = "serde_support"))]
fn timestamp_now() -> Option<String> {
    None
}

impl BundleDocument {
    /// Reads `files` in parallel and assembles the document. Unreadable or
    /// non-UTF-8 files are left out of the codebase section but kept in
    /// the tree.
    pub fn build(project_root: &Path, files: &[PathBuf], options: &BundleOptions) -> Self {
        log::debug!("Reading {} file(s) for the bundle", files.len());
        let mut entries: Vec<BundleFile> = files
            .par_iter()
            .filter_map(|path| {
                let bytes = match fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("Skipping unreadable file {}: {}", path.display(), e);
                        return None;
                    }
                };
                match String::from_utf8(bytes) {
                    Ok(content) => Some(BundleFile {
                        path: relative_display(path, project_root),
                        language: language_label(path),
                        content,
                    }),
                    Err(_) => {
                        log::debug!("Skipping non-UTF-8 file: {}", path.display());
                        None
                    }
                }
            })
            .collect();
        entries.par_sort_unstable_by(|a, b| a.path.cmp(&b.path));

        let tree = options.include_tree.then(|| {
            let relative: Vec<String> = files
                .iter()
                .map(|f| relative_display(f, project_root))
                .collect();
            tree::render_tree_lines(&build_project_tree(&options.project_name, &relative))
        });

        Self {
            project_name: options.project_name.clone(),
            project_root: options
                .include_project_root
                .then(|| project_root.to_string_lossy().into_owned()),
            generated_at: if options.include_timestamp {
                timestamp_now()
            } else {
                None
            },
            tree,
            files: entries,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if let Some(tree) = &self.tree {
            out.push_str("# Project Tree\n\n```text\n");
            for line in tree {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
        out.push_str("# Codebase\n");
        for file in &self.files {
            let fence = fence_for(&file.content);
            out.push_str(&format!("\n## {}\n\n{}{}\n", file.path, fence, file.language));
            out.push_str(&file.content);
            if !file.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
        }
        out
    }
}

pub fn build_project_tree(root_name: &str, relative_paths: &[String]) -> DirectoryTreeNode {
    let mut sorted = relative_paths.to_vec();
    sorted.sort();
    tree::build_tree(root_name, &sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> BundleOptions {
        BundleOptions {
            project_name: "demo".to_string(),
            include_tree: true,
            include_project_root: false,
            include_timestamp: false,
        }
    }

    #[test]
    fn labels_follow_the_language_table() {
        assert_eq!(language_label(Path::new("/p/a.rs")), "rust");
        assert_eq!(language_label(Path::new("/p/Dockerfile")), "dockerfile");
        assert_eq!(language_label(Path::new("/p/Dockerfile-dev")), "dockerfile");
        assert_eq!(language_label(Path::new("/p/notes.weird")), "weird");
        assert_eq!(language_label(Path::new("/p/LICENSE")), "text");
    }

    #[test]
    fn fence_outgrows_embedded_backticks() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("```rust\n```"), "````");
        assert_eq!(fence_for("`````"), "``````");
    }

    #[test]
    fn markdown_lists_tree_then_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("src")).unwrap();
        fs::write(root.join("src/b.py"), "import a\n").unwrap();
        fs::write(root.join("src/a.py"), "x = 1").unwrap();
        fs::write(root.join("blob.bin"), [0xffu8, 0xfe, 0x00]).unwrap();

        let files = vec![
            root.join("src/b.py"),
            root.join("src/a.py"),
            root.join("blob.bin"),
        ];
        let doc = BundleDocument::build(root, &files, &options());
        let paths: Vec<&str> = doc.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.py", "src/b.py"]);
        assert_eq!(doc.tree.as_ref().unwrap()[0], "demo/");

        let markdown = doc.to_markdown();
        let expected_tail = "# Codebase\n\n## src/a.py\n\n```python\nx = 1\n```\n\n## src/b.py\n\n```python\nimport a\n```\n";
        assert!(markdown.starts_with("# Project Tree\n\n```text\ndemo/\n├── blob.bin\n"));
        assert!(markdown.ends_with(expected_tail));
    }
}
