//! Target handling: the write cursor ("anchor") into the target tree.
//!
//! A `TargetHandler` owns the target tree while one generator runs and
//! tracks where handlers should write. How the anchor follows the source
//! traversal is a strategy chosen at registration time:
//!
//! - [`NullAnchor`] leaves the anchor alone; for generators whose handlers
//!   only touch tokens or address the target explicitly.
//! - [`TreeSync`] keeps write depth aligned with source depth. Each target
//!   node finalized for a source node is stamped with that node's path, and
//!   when traversal comes back up (a sibling or a shallower node) the anchor
//!   backs out to the nearest ancestor whose stamped depth is smaller than
//!   the current source depth. This works even when the source and target
//!   trees branch differently.
//!
//! `finalize` also records source identity → target identity in a shared
//! token so later generators (or later runs) can find the target node that
//! was generated for a source node.

use crate::error::EngineError;
use crate::registry::Registry;
use crate::token::{Fields, TokenRef};
use crate::tree::{NodeId, SourceNode, Tree};
use crate::types::Identity;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Token holding the source → target identity map
pub const IDENTITY_TOKEN: &str = "source-target-identities";
/// Field of [`IDENTITY_TOKEN`] holding `{source_hex: target_hex}`
pub const IDENTITY_FIELD: &str = "identities";

/// Strategy deciding how the anchor follows the source traversal
pub trait AnchorPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called for every source node before its handlers are dispatched
    fn reposition(&self, handler: &mut TargetHandler, source: SourceNode<'_>)
        -> Result<(), EngineError>;
}

/// Leaves the anchor where handlers put it
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnchor;

impl AnchorPolicy for NullAnchor {
    fn name(&self) -> &'static str {
        "null"
    }

    fn reposition(&self, _handler: &mut TargetHandler, _source: SourceNode<'_>) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Backs the anchor out to the ancestor matching the source depth
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSync;

impl AnchorPolicy for TreeSync {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn reposition(&self, handler: &mut TargetHandler, source: SourceNode<'_>) -> Result<(), EngineError> {
        let depth = source.path_len();
        let tree = handler.target();
        let mut anchor = handler.anchor();
        if depth > tree.source_path(anchor).len() {
            return Ok(());
        }

        while tree.source_path(anchor).len() >= depth {
            match tree.parent(anchor) {
                Some(parent) => anchor = parent,
                None => break,
            }
        }

        trace!(
            source = ?source,
            anchor = %tree.path(anchor).join("/"),
            "Anchor backed out"
        );
        handler.anchor = anchor;
        Ok(())
    }
}

/// Target tree plus the anchor handlers write relative to
pub struct TargetHandler {
    target: Tree,
    anchor: NodeId,
    policy: Arc<dyn AnchorPolicy>,
}

impl TargetHandler {
    /// Wrap a target tree; the anchor starts at its root
    pub fn new(target: Tree, policy: Arc<dyn AnchorPolicy>) -> Self {
        let anchor = target.root();
        Self {
            target,
            anchor,
            policy,
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn target(&self) -> &Tree {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut Tree {
        &mut self.target
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn anchor_path(&self) -> Vec<String> {
        self.target.path(self.anchor)
    }

    /// Let the anchor policy react to the next source node
    pub fn visit(&mut self, source: SourceNode<'_>) -> Result<(), EngineError> {
        let policy = Arc::clone(&self.policy);
        policy.reposition(self, source)
    }

    /// Move the anchor to the node addressed by root-relative child names
    ///
    /// Fails with `TargetNotFound` as soon as a segment is missing; the
    /// anchor is left unchanged in that case.
    pub fn set_anchor<S: AsRef<str>>(&mut self, path: &[S]) -> Result<(), EngineError> {
        self.anchor = self.target.resolve_path(path)?;
        Ok(())
    }

    pub fn set_anchor_node(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.ensure_live(node)?;
        self.anchor = node;
        Ok(())
    }

    /// Create a child of the anchor
    pub fn add_child(&mut self, name: impl Into<String>) -> Result<NodeId, EngineError> {
        self.target.add_child(self.anchor, name)
    }

    /// Bind a freshly built target node to its source node
    ///
    /// Stamps the target node with the source path, records the identity
    /// mapping and, when `advance` is set, moves the anchor onto it.
    pub fn finalize(
        &mut self,
        registry: &Registry,
        source: SourceNode<'_>,
        target: NodeId,
        advance: bool,
    ) -> Result<(), EngineError> {
        self.ensure_live(target)?;
        self.target.set_source_path(target, source.path());
        record_identity(registry, source.identity(), self.target.identity(target))?;
        if advance {
            self.anchor = target;
        }
        Ok(())
    }

    /// Target node previously generated for `source`, if it is in this tree
    pub fn resolve(&self, registry: &Registry, source: SourceNode<'_>) -> Option<NodeId> {
        let target = lookup_identity(registry, &source.identity())?;
        self.target.find_by_identity(&target)
    }

    /// Hand the (possibly extended) target tree on to the next generator
    pub fn into_target(self) -> Tree {
        self.target
    }

    fn ensure_live(&self, node: NodeId) -> Result<(), EngineError> {
        if self.target.contains(node) {
            Ok(())
        } else {
            Err(EngineError::TargetNotFound(vec![format!("<node {}>", node.index())]))
        }
    }
}

impl fmt::Debug for TargetHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandler")
            .field("policy", &self.policy.name())
            .field("anchor", &self.anchor_path())
            .field("target", &self.target.label())
            .finish()
    }
}

fn identity_token(registry: &Registry) -> Result<TokenRef, EngineError> {
    let mut fields = Fields::new();
    fields.insert(IDENTITY_FIELD.to_string(), Value::Object(Map::new()));
    registry.tokens().token(IDENTITY_TOKEN, true, false, fields)
}

/// Record that `source` was generated into `target`
pub fn record_identity(registry: &Registry, source: Identity, target: Identity) -> Result<(), EngineError> {
    let token = identity_token(registry)?;
    let mut token = token.lock();
    match token.get_mut(IDENTITY_FIELD) {
        Some(Value::Object(map)) => {
            map.insert(source.to_hex(), Value::String(target.to_hex()));
        }
        _ => {
            let mut map = Map::new();
            map.insert(source.to_hex(), Value::String(target.to_hex()));
            token.set(IDENTITY_FIELD, Value::Object(map));
        }
    }
    Ok(())
}

/// Target identity recorded for `source`, if any
pub fn lookup_identity(registry: &Registry, source: &Identity) -> Option<Identity> {
    let token = registry.tokens().lookup(IDENTITY_TOKEN).ok()?;
    let token = token.lock();
    token
        .get(IDENTITY_FIELD)?
        .get(source.to_hex())?
        .as_str()
        .and_then(Identity::from_hex)
}

/// Snapshot of the whole identity map
pub fn identity_map(registry: &Registry) -> BTreeMap<Identity, Identity> {
    let mut result = BTreeMap::new();
    let Ok(token) = registry.tokens().lookup(IDENTITY_TOKEN) else {
        return result;
    };
    let token = token.lock();
    if let Some(Value::Object(map)) = token.get(IDENTITY_FIELD) {
        for (source, target) in map {
            let source = Identity::from_hex(source);
            let target = target.as_str().and_then(Identity::from_hex);
            if let (Some(source), Some(target)) = (source, target) {
                result.insert(source, target);
            }
        }
    }
    result
}

/// Load previously persisted mappings into the identity token
pub fn seed_identity_map(
    registry: &Registry,
    map: &BTreeMap<Identity, Identity>,
) -> Result<(), EngineError> {
    for (source, target) in map {
        record_identity(registry, *source, *target)?;
    }
    Ok(())
}
