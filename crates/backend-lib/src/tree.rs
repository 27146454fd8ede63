// ============================
// codecollab-backend/src/tree.rs
// ============================
//! Nested file/folder tree addressed by slash-delimited paths.
//!
//! Empty segments are skipped, so `"/a//b"` addresses the same node as `"a/b"`.
//! All lookups walk the typed [`TreeNode`] structure; a file found where a
//! folder is expected ends the walk.
use codecollab_common::{FileTree, TreeNode};
use thiserror::Error;

/// Errors raised by tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path has no segments")]
    EmptyPath,

    #[error("Not a folder: {0}")]
    NotAFolder(String),
}

/// The shared file tree of one room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTree {
    root: FileTree,
}

/// Non-empty segments of `path`
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Canonical form of `path`: its non-empty segments joined by `/`
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// True iff `path` lies strictly beneath `ancestor`.
///
/// A textual prefix test on the normalized forms, separator included, so
/// `docs2/readme` is not beneath `docs`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    normalize(path).starts_with(&format!("{}/", normalize(ancestor)))
}

fn split_parent(path: &str) -> Option<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = segments(path).collect();
    let last = parts.pop()?;
    Some((parts, last))
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing root folder
    pub fn from_files(root: FileTree) -> Self {
        Self { root }
    }

    /// Root folder contents
    pub fn files(&self) -> &FileTree {
        &self.root
    }

    /// Owned copy of the whole tree, as sent to clients
    pub fn snapshot(&self) -> FileTree {
        self.root.clone()
    }

    fn folder(&self, parents: &[&str]) -> Option<&FileTree> {
        let mut current = &self.root;
        for segment in parents {
            current = match current.get(*segment)? {
                TreeNode::Folder(children) => children,
                TreeNode::File(_) => return None,
            };
        }
        Some(current)
    }

    fn folder_mut(&mut self, parents: &[&str]) -> Option<&mut FileTree> {
        let mut current = &mut self.root;
        for segment in parents {
            current = match current.get_mut(*segment)? {
                TreeNode::Folder(children) => children,
                TreeNode::File(_) => return None,
            };
        }
        Some(current)
    }

    /// Node at `path`, file or folder
    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        let (parents, last) = split_parent(path)?;
        self.folder(&parents)?.get(last)
    }

    /// Content of the file at `path`.
    ///
    /// Folders and missing paths are both `NotFound`.
    pub fn read_file(&self, path: &str) -> Result<&str, TreeError> {
        self.get(path)
            .and_then(TreeNode::as_file)
            .ok_or_else(|| TreeError::NotFound(normalize(path)))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.get(path).is_some_and(TreeNode::is_file)
    }

    pub fn is_folder(&self, path: &str) -> bool {
        self.get(path).is_some_and(TreeNode::is_folder)
    }

    /// Write `node` at `path`, creating missing intermediate folders.
    ///
    /// The final segment is overwritten whatever it held before. An
    /// intermediate segment that is a file is an error and leaves the tree
    /// untouched: folders are only created below the first missing segment,
    /// so nothing has been created by the time a file is hit.
    pub fn set(&mut self, path: &str, node: TreeNode) -> Result<(), TreeError> {
        let (parents, last) = split_parent(path).ok_or(TreeError::EmptyPath)?;

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            current = match current
                .entry((*segment).to_string())
                .or_insert_with(TreeNode::empty_folder)
            {
                TreeNode::Folder(children) => children,
                TreeNode::File(_) => {
                    return Err(TreeError::NotAFolder(parents[..=depth].join("/")));
                },
            };
        }

        current.insert(last.to_string(), node);
        Ok(())
    }

    /// Remove the node at `path` together with everything beneath it.
    ///
    /// Returns `false` when nothing was there.
    pub fn delete(&mut self, path: &str) -> bool {
        let Some((parents, last)) = split_parent(path) else {
            return false;
        };
        self.folder_mut(&parents)
            .and_then(|folder| folder.remove(last))
            .is_some()
    }

    /// Every file path in the tree, depth first in name order
    pub fn file_paths(&self) -> Vec<String> {
        fn walk(prefix: &str, folder: &FileTree, out: &mut Vec<String>) {
            for (name, node) in folder {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                match node {
                    TreeNode::File(_) => out.push(path),
                    TreeNode::Folder(children) => walk(&path, children, out),
                }
            }
        }

        let mut out = Vec::new();
        walk("", &self.root, &mut out);
        out
    }
}
