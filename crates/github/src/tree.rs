//! File Tree Builder
//!
//! Turns a flat recursive tree listing into nested directory nodes for
//! browsing. Only blobs become files; directories are inferred from paths.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{TreeItem, TreeItemKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File {
        path: String,
        name: String,
    },
    Dir {
        path: String,
        name: String,
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. } | TreeNode::Dir { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::File { path, .. } | TreeNode::Dir { path, .. } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Dir { .. })
    }

    /// Paths of every file below this node, depth first in display order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files(&self, out: &mut Vec<String>) {
        match self {
            TreeNode::File { path, .. } => out.push(path.clone()),
            TreeNode::Dir { children, .. } => {
                for child in children {
                    child.collect_files(out);
                }
            }
        }
    }
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, String>,
}

impl DirBuilder {
    fn insert(&mut self, full_path: &str) {
        let mut level = self;
        let mut parts = full_path.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                level
                    .files
                    .entry(part.to_string())
                    .or_insert_with(|| full_path.to_string());
                return;
            }
            level = level.dirs.entry(part.to_string()).or_default();
        }
    }

    fn finish(self, parent: &str) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = Vec::with_capacity(self.dirs.len() + self.files.len());
        for (name, dir) in self.dirs {
            let path = if parent.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", parent, name)
            };
            let children = dir.finish(&path);
            nodes.push(TreeNode::Dir {
                path,
                name,
                children,
            });
        }
        for (name, path) in self.files {
            nodes.push(TreeNode::File { path, name });
        }
        nodes.sort_by(compare_nodes);
        nodes
    }
}

/// Directories first, then files; each group ordered case-insensitively.
fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.name().cmp(b.name())),
    }
}

/// Build the nested tree from a recursive listing.
pub fn build_tree(items: &[TreeItem]) -> Vec<TreeNode> {
    let mut root = DirBuilder::default();
    for item in items.iter().filter(|i| i.kind == TreeItemKind::Blob) {
        root.insert(&item.path);
    }
    root.finish("")
}
