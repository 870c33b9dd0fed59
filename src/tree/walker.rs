//! Filesystem walker building a source tree from a directory

use crate::error::StorageError;
use crate::tree::{NodeId, Tree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Capability tag of directory nodes
pub const TAG_DIRECTORY: &str = "directory";
/// Capability tag of file nodes
pub const TAG_FILE: &str = "file";
/// Attribute holding the absolute filesystem path of a node
pub const ATTR_PATH: &str = "path";

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Path components to ignore (e.g., ".git", "target")
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![".git".to_string(), "target".to_string()],
            max_depth: None,
        }
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the directory and build a tree labelled `label`
    ///
    /// Entries are visited in file-name order, so the same directory always
    /// yields the same child order and the same node identities.
    pub fn walk(&self, label: &str) -> Result<Tree, StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let mut tree = Tree::new(label, root_name(&self.root));
        let root = tree.root();
        tree.add_tag(root, TAG_DIRECTORY);
        tree.set_attribute(root, ATTR_PATH, self.root.to_string_lossy().to_string());

        let mut ids: HashMap<PathBuf, NodeId> = HashMap::new();
        ids.insert(self.root.clone(), root);

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .min_depth(1);

        let ignore = &self.config.ignore_patterns;
        for entry in walker
            .into_iter()
            .filter_entry(|entry| !should_ignore(entry, ignore))
        {
            let entry = entry.map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk directory: {}", e),
                ))
            })?;

            let path = entry.path().to_path_buf();
            let parent_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let parent = match ids.get(&parent_path) {
                Some(id) => *id,
                None => continue,
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let id = tree
                .add_child(parent, name)
                .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
            tree.set_attribute(id, ATTR_PATH, path.to_string_lossy().to_string());

            let file_type = entry.file_type();
            if file_type.is_dir() {
                tree.add_tag(id, TAG_DIRECTORY);
                ids.insert(path, id);
            } else if file_type.is_file() {
                tree.add_tag(id, TAG_FILE);
            }
        }

        debug!(root = %self.root.display(), node_count = tree.len(), "Walked directory");
        Ok(tree)
    }
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string())
}

/// Check if an entry should be ignored based on its file name
fn should_ignore(entry: &DirEntry, patterns: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| name == pattern.as_str())
}
