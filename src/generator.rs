//! Generator: one named phase of a transform.
//!
//! A generator walks the source tree in pre-order. At every node the target
//! handler repositions its anchor first, then the dispatcher runs the
//! node's handlers, and only then are the children visited, so writes made
//! for a parent are in place before any child handler runs.

use crate::dispatch::Dispatch;
use crate::error::EngineError;
use crate::registry::Registry;
use crate::target::TargetHandler;
use crate::tree::{SourceNode, Tree};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Descriptions are wrapped to lines shorter than this
pub const DESCRIPTION_WIDTH: usize = 60;

/// Which generator must run before this one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// No dependency; the generator hangs off the root of the dependency forest
    Root,
    /// Bare name of another generator of the same transform
    On(String),
}

impl Dependency {
    /// Parse a declared dependency; absent, empty and `none` mean [`Dependency::Root`]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Dependency::Root,
            Some(name) if name.eq_ignore_ascii_case("none") => Dependency::Root,
            Some(name) => Dependency::On(name.to_string()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Dependency::Root => None,
            Dependency::On(name) => Some(name.as_str()),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Root => f.write_str("none"),
            Dependency::On(name) => f.write_str(name),
        }
    }
}

/// A generation phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    name: String,
    transform: String,
    depends: Dependency,
    description: String,
    backup: bool,
}

impl Generator {
    /// Create a generator registered as `<transform>.<name>`
    pub fn new(transform: &str, name: &str, depends: Dependency) -> Self {
        Self {
            name: format!("{}.{}", transform, name),
            transform: transform.to_string(),
            depends,
            description: String::new(),
            backup: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = normalize_description(description);
        self
    }

    /// Whether output written by this generator should back up what it replaces
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Qualified name, `<transform>.<generator>`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the transform prefix
    pub fn short_name(&self) -> &str {
        &self.name[self.transform.len() + 1..]
    }

    pub fn transform(&self) -> &str {
        &self.transform
    }

    pub fn depends(&self) -> &Dependency {
        &self.depends
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn backup(&self) -> bool {
        self.backup
    }

    /// Walk `source` and dispatch every node; returns the number of visited nodes
    #[instrument(skip_all, fields(generator = %self.name))]
    pub fn run(
        &self,
        registry: &Registry,
        source: &Tree,
        target: &mut TargetHandler,
    ) -> Result<usize, EngineError> {
        let start = Instant::now();
        let dispatcher = registry.dispatchers().get(&self.name)?;

        let mut visited = 0;
        self.walk(
            registry,
            dispatcher.as_ref(),
            source.node(source.root()),
            target,
            &mut visited,
        )?;

        info!(
            visited,
            target_nodes = target.target().len(),
            duration_ms = start.elapsed().as_millis(),
            "Generator completed"
        );
        Ok(visited)
    }

    fn walk(
        &self,
        registry: &Registry,
        dispatcher: &dyn Dispatch,
        node: SourceNode<'_>,
        target: &mut TargetHandler,
        visited: &mut usize,
    ) -> Result<(), EngineError> {
        target.visit(node)?;
        dispatcher.dispatch(registry, node, target)?;
        *visited += 1;

        debug!(node = ?node, anchor = ?target.anchor_path(), "Dispatched node");

        for child in node.children() {
            self.walk(registry, dispatcher, child, target, visited)?;
        }
        Ok(())
    }
}

/// Collapse whitespace and wrap text to lines shorter than [`DESCRIPTION_WIDTH`]
pub fn normalize_description(text: &str) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() >= DESCRIPTION_WIDTH {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
