//! Filesystem trees: directory sources and directory-materialized targets.

use crate::controller::Transform;
use crate::error::{EngineError, StorageError};
use crate::tree::walker::{Walker, WalkerConfig, ATTR_PATH, TAG_DIRECTORY, TAG_FILE};
use crate::tree::{Materialize, NodeId, Tree};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Attribute holding the text a file node is written with
pub const ATTR_CONTENT: &str = "content";
/// Attribute naming the file a file node is copied from
pub const ATTR_COPY_FROM: &str = "copy_from";
/// Attribute asking to keep a `.bak` copy of a file that gets overwritten
pub const ATTR_BACKUP: &str = "backup";

/// Root name of the source tree when several directories are combined
pub const COMBINED_ROOT: &str = "sources";

/// Transform reading directories and producing a directory
#[derive(Debug, Clone)]
pub struct DirectoryTransform {
    name: String,
    walker: WalkerConfig,
}

impl DirectoryTransform {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walker: WalkerConfig::default(),
        }
    }

    pub fn with_walker_config(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }
}

impl Transform for DirectoryTransform {
    fn name(&self) -> &str {
        &self.name
    }

    /// One directory is walked as is; several are combined under a
    /// `sources` root, one child per directory
    fn source(&self, paths: &[PathBuf]) -> Result<Option<Tree>, EngineError> {
        match paths {
            [] => Ok(None),
            [path] => {
                let tree = Walker::with_config(path.clone(), self.walker.clone()).walk("source")?;
                Ok(Some(tree))
            }
            _ => {
                let mut combined = Tree::new("source", COMBINED_ROOT);
                let root = combined.root();
                combined.add_tag(root, TAG_DIRECTORY);
                for path in paths {
                    let tree = Walker::with_config(path.clone(), self.walker.clone()).walk("source")?;
                    graft(&mut combined, root, &tree, tree.root())?;
                }
                Ok(Some(combined))
            }
        }
    }

    fn target(&self, path: &Path) -> Result<Tree, EngineError> {
        let root_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let mut tree = Tree::new("target", root_name)
            .with_materializer(Arc::new(DirectoryMaterializer::new(path.to_path_buf())));
        let root = tree.root();
        tree.add_tag(root, TAG_DIRECTORY);
        tree.set_attribute(root, ATTR_PATH, path.to_string_lossy().to_string());
        Ok(tree)
    }
}

/// Copy the subtree at `node` of `source` below `parent` of `dest`
fn graft(dest: &mut Tree, parent: NodeId, source: &Tree, node: NodeId) -> Result<(), EngineError> {
    let id = dest.add_child(parent, source.name(node))?;
    for tag in source.tags(node) {
        dest.add_tag(id, tag.clone());
    }
    if let Some(path) = source.attribute(node, ATTR_PATH) {
        dest.set_attribute(id, ATTR_PATH, path.clone());
    }
    for child in source.children(node) {
        graft(dest, id, source, child)?;
    }
    Ok(())
}

/// Writes a target tree out as a directory
///
/// The tree root is `root`; every other node lives at its root-relative
/// name path. `directory` nodes are created, `file` nodes are written from
/// their `content` attribute or copied from `copy_from`. Untagged nodes are
/// not written.
#[derive(Debug, Clone)]
pub struct DirectoryMaterializer {
    root: PathBuf,
}

impl DirectoryMaterializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn location(&self, tree: &Tree, id: NodeId) -> PathBuf {
        tree.path(id)
            .iter()
            .skip(1)
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn write_file(&self, tree: &Tree, id: NodeId, location: &Path) -> Result<(), StorageError> {
        if let Some(parent) = location.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let backup = tree
            .attribute(id, ATTR_BACKUP)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if backup && location.is_file() {
            let mut backup_path = location.as_os_str().to_os_string();
            backup_path.push(".bak");
            std::fs::copy(location, &backup_path)?;
            debug!(path = %location.display(), "Backed up existing file");
        }

        if let Some(content) = tree.attribute(id, ATTR_CONTENT) {
            let text = match content.as_str() {
                Some(text) => text.to_string(),
                None => content.to_string(),
            };
            std::fs::write(location, text)?;
        } else if let Some(from) = tree.attribute(id, ATTR_COPY_FROM).and_then(|v| v.as_str()) {
            std::fs::copy(from, location)?;
        } else {
            return Err(StorageError::InvalidPath(format!(
                "File node {} has neither '{}' nor '{}'",
                location.display(),
                ATTR_CONTENT,
                ATTR_COPY_FROM
            )));
        }
        Ok(())
    }
}

impl Materialize for DirectoryMaterializer {
    fn materialize(&self, tree: &Tree) -> Result<(), StorageError> {
        let mut directories = 0;
        let mut files = 0;
        for id in tree.pre_order() {
            let location = self.location(tree, id);
            if tree.has_tag(id, TAG_DIRECTORY) {
                std::fs::create_dir_all(&location)?;
                directories += 1;
            } else if tree.has_tag(id, TAG_FILE) {
                self.write_file(tree, id, &location)?;
                files += 1;
            }
        }
        info!(root = %self.root.display(), directories, files, "Materialized target tree");
        Ok(())
    }
}
