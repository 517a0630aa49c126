use log;
use serde::Serialize;
use std::collections::BTreeMap;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryTreeNode {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, DirectoryTreeNode>,
}

impl DirectoryTreeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Inserts a `/`-separated relative path, creating intermediate nodes.
    pub fn insert(&mut self, relative_path: &str) {
        let mut node = self;
        for segment in relative_path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| DirectoryTreeNode::new(segment));
        }
    }

    pub fn file_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.values().map(DirectoryTreeNode::file_count).sum()
    }
}

pub fn build_tree(root_name: &str, relative_paths: &[String]) -> DirectoryTreeNode {
    log::debug!("Building tree from {} path(s)", relative_paths.len());
    let mut root = DirectoryTreeNode::new(root_name);
    for path in relative_paths {
        root.insert(path);
    }
    root
}

/// ASCII drawing of the tree, one entry per line. Interior nodes end in `/`.
pub fn render_tree_lines(root: &DirectoryTreeNode) -> Vec<String> {
    let mut lines = vec![format!("{}/", root.name)];
    render_children(root, "", &mut lines);
    lines
}

pub fn render_tree(root: &DirectoryTreeNode) -> String {
    render_tree_lines(root).join("\n")
}

fn render_children(node: &DirectoryTreeNode, prefix: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (index, child) in node.children.values().enumerate() {
        let last = index + 1 == count;
        let connector = if last { LAST_BRANCH } else { BRANCH };
        let suffix = if child.is_leaf() { "" } else { "/" };
        lines.push(format!("{}{}{}{}", prefix, connector, child.name, suffix));
        if !child.is_leaf() {
            let extension = if last { SPACE } else { PIPE };
            render_children(child, &format!("{}{}", prefix, extension), lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_connectors_and_sorted_children() {
        let paths = vec![
            "src/utils/b.js".to_string(),
            "src/a.js".to_string(),
            "README.md".to_string(),
            "src/utils/a.js".to_string(),
        ];
        let tree = build_tree("demo", &paths);
        let expected = "\
demo/
├── README.md
└── src/
    ├── a.js
    └── utils/
        ├── a.js
        └── b.js";
        assert_eq!(render_tree(&tree), expected);
        assert_eq!(tree.file_count(), 4);
    }

    #[test]
    fn non_last_directories_continue_the_pipe() {
        let paths = vec!["a/x.rs".to_string(), "b.rs".to_string()];
        let lines = render_tree_lines(&build_tree("p", &paths));
        assert_eq!(lines, vec!["p/", "├── a/", "│   └── x.rs", "└── b.rs"]);
    }

    #[test]
    fn duplicate_paths_collapse() {
        let paths = vec!["a.rs".to_string(), "./a.rs".to_string()];
        assert_eq!(build_tree("p", &paths).children.len(), 1);
    }
}
