//! Source and Target Trees
//!
//! Both sides of a transform are held in the same structure: an append-only
//! arena of named nodes with ordered children, capability tags, free-form
//! attributes and a stable identity. Nodes are never removed, so a `NodeId`
//! handed out by a tree stays valid for the lifetime of that tree.

pub mod identity;
pub mod walker;

use crate::error::{EngineError, StorageError};
use crate::types::Identity;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Index of a node inside its owning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Materialisation contract of a target tree (e.g. writing itself to disk)
pub trait Materialize: Send + Sync {
    fn materialize(&self, tree: &Tree) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<(String, NodeId)>,
    identity: Identity,
    tags: BTreeSet<String>,
    attributes: BTreeMap<String, Value>,
    /// Source path stamped by the sync finalize; empty until then
    source_path: Vec<String>,
}

impl NodeData {
    fn new(name: String, parent: Option<NodeId>, identity: Identity) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            identity,
            tags: BTreeSet::new(),
            attributes: BTreeMap::new(),
            source_path: Vec::new(),
        }
    }
}

/// Ordered tree of named nodes
#[derive(Clone)]
pub struct Tree {
    label: String,
    nodes: Vec<NodeData>,
    by_identity: HashMap<Identity, NodeId>,
    materializer: Option<Arc<dyn Materialize>>,
}

impl Tree {
    /// Create a tree holding only its root node
    ///
    /// The label namespaces node identities, so a source and a target tree
    /// with identical shapes still get distinct identities.
    pub fn new(label: impl Into<String>, root_name: impl Into<String>) -> Self {
        let label = label.into();
        let root_name = root_name.into();
        let identity = identity::compute_identity(&label, &[root_name.as_str()]);
        Self {
            label,
            nodes: vec![NodeData::new(root_name, None, identity)],
            by_identity: HashMap::from([(identity, NodeId(0))]),
            materializer: None,
        }
    }

    pub fn with_materializer(mut self, materializer: Arc<dyn Materialize>) -> Self {
        self.materializer = Some(materializer);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children in insertion order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().map(|(_, child)| *child)
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, child)| *child)
    }

    /// Append a named child; names are unique per parent
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, EngineError> {
        let name = name.into();
        if self.child(parent, &name).is_some() {
            return Err(EngineError::DuplicateChild {
                parent: self.name(parent).to_string(),
                name,
            });
        }

        let mut path = self.path(parent);
        path.push(name.clone());
        let identity = identity::compute_identity(&self.label, &path);

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(name.clone(), Some(parent), identity));
        self.nodes[parent.0].children.push((name, id));
        self.by_identity.entry(identity).or_insert(id);
        Ok(id)
    }

    /// Root-inclusive list of node names
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(self.nodes[node.0].name.clone());
            current = self.nodes[node.0].parent;
        }
        path.reverse();
        path
    }

    /// Number of edges between the node and the root (root = 0)
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(node) = current {
            depth += 1;
            current = self.nodes[node.0].parent;
        }
        depth
    }

    /// Walk child names starting at the root; the empty path addresses the root
    pub fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Result<NodeId, EngineError> {
        let mut current = self.root();
        for (position, segment) in path.iter().enumerate() {
            current = self.child(current, segment.as_ref()).ok_or_else(|| {
                EngineError::TargetNotFound(
                    path[..=position]
                        .iter()
                        .map(|s| s.as_ref().to_string())
                        .collect(),
                )
            })?;
        }
        Ok(current)
    }

    pub fn identity(&self, id: NodeId) -> Identity {
        self.nodes[id.0].identity
    }

    /// Override a node's identity, e.g. with an id carried by the input model
    ///
    /// The new identity takes over lookups from any node that held it before.
    pub fn set_identity(&mut self, id: NodeId, identity: Identity) {
        let previous = std::mem::replace(&mut self.nodes[id.0].identity, identity);
        if self.by_identity.get(&previous) == Some(&id) {
            self.by_identity.remove(&previous);
        }
        self.by_identity.insert(identity, id);
    }

    pub fn find_by_identity(&self, identity: &Identity) -> Option<NodeId> {
        self.by_identity.get(identity).copied()
    }

    pub fn tags(&self, id: NodeId) -> &BTreeSet<String> {
        &self.nodes[id.0].tags
    }

    pub fn add_tag(&mut self, id: NodeId, tag: impl Into<String>) {
        self.nodes[id.0].tags.insert(tag.into());
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.nodes[id.0].tags.contains(tag)
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.nodes[id.0].attributes.get(key)
    }

    pub fn set_attribute(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<Value>) {
        self.nodes[id.0].attributes.insert(key.into(), value.into());
    }

    pub fn source_path(&self, id: NodeId) -> &[String] {
        &self.nodes[id.0].source_path
    }

    pub fn set_source_path(&mut self, id: NodeId, path: Vec<String>) {
        self.nodes[id.0].source_path = path;
    }

    /// All node ids in pre-order (parent before children, children in order)
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            for (_, child) in self.nodes[id.0].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// Read-only view of a node
    pub fn node(&self, id: NodeId) -> SourceNode<'_> {
        SourceNode { tree: self, id }
    }

    /// Run the tree's materialisation contract
    pub fn materialize(&self) -> Result<(), StorageError> {
        match &self.materializer {
            Some(materializer) => materializer.materialize(self),
            None => {
                debug!(tree = %self.label, "Tree has no materializer, skipping");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("label", &self.label)
            .field("nodes", &self.nodes)
            .field("materializer", &self.materializer.is_some())
            .finish()
    }
}

/// Borrowed view of one node, handed to generators and handlers
#[derive(Clone, Copy)]
pub struct SourceNode<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> SourceNode<'a> {
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        self.tree.name(self.id)
    }

    pub fn path(&self) -> Vec<String> {
        self.tree.path(self.id)
    }

    /// Length of the root-inclusive path (root = 1)
    pub fn path_len(&self) -> usize {
        self.tree.depth(self.id) + 1
    }

    pub fn identity(&self) -> Identity {
        self.tree.identity(self.id)
    }

    pub fn tags(&self) -> &'a BTreeSet<String> {
        self.tree.tags(self.id)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tree.has_tag(self.id, tag)
    }

    pub fn attribute(&self, key: &str) -> Option<&'a Value> {
        self.tree.attribute(self.id, key)
    }

    pub fn is_root(&self) -> bool {
        self.tree.parent(self.id).is_none()
    }

    pub fn parent(&self) -> Option<SourceNode<'a>> {
        self.tree.parent(self.id).map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = SourceNode<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).map(move |id| tree.node(id))
    }
}

impl fmt::Debug for SourceNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceNode({})", self.path().join("/"))
    }
}
