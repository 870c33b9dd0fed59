//! Shared test utilities for integration tests
//!
//! Recording handlers, an in-memory transform and a counting materializer.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treegen::error::StorageError;
use treegen::{EngineError, Handler, Materialize, Rank, Registry, Transform, Tree};

/// Ordered log shared between handlers and the test body
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Register a handler that appends `<label>:<node name>` for every node it sees
pub fn record(
    registry: &mut Registry,
    log: &Log,
    transform: &str,
    generator: &str,
    name: &str,
    rank: Rank,
) {
    let log = Arc::clone(log);
    let label = name.to_string();
    registry
        .register_handler(
            Handler::new(transform, generator, name, move |visit, _| {
                log.lock().push(format!("{}:{}", label, visit.source.name()));
                Ok(())
            })
            .ranked(rank),
        )
        .unwrap();
}

/// Source tree `root -> {x, y}`, `x -> {x1}`
pub fn xy_tree() -> Tree {
    let mut tree = Tree::new("source", "root");
    let root = tree.root();
    let x = tree.add_child(root, "x").unwrap();
    tree.add_child(x, "x1").unwrap();
    tree.add_child(root, "y").unwrap();
    tree
}

/// Counts how often a tree was materialized
#[derive(Default)]
pub struct CountingMaterializer {
    pub count: Mutex<usize>,
}

impl Materialize for CountingMaterializer {
    fn materialize(&self, _tree: &Tree) -> Result<(), StorageError> {
        *self.count.lock() += 1;
        Ok(())
    }
}

/// Transform with a fixed source (or continuation) and a labelled empty target
pub struct MockTransform {
    pub name: String,
    pub source: Option<Tree>,
    pub materializer: Option<Arc<CountingMaterializer>>,
}

impl MockTransform {
    pub fn new(name: &str, source: Option<Tree>) -> Self {
        Self {
            name: name.to_string(),
            source,
            materializer: None,
        }
    }

    pub fn materialized_by(mut self, materializer: Arc<CountingMaterializer>) -> Self {
        self.materializer = Some(materializer);
        self
    }
}

impl Transform for MockTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self, _paths: &[PathBuf]) -> Result<Option<Tree>, EngineError> {
        Ok(self.source.clone())
    }

    fn target(&self, path: &Path) -> Result<Tree, EngineError> {
        let tree = Tree::new(format!("{}-target", self.name), path.display().to_string());
        Ok(match &self.materializer {
            Some(materializer) => tree.with_materializer(Arc::clone(materializer) as Arc<dyn Materialize>),
            None => tree,
        })
    }
}
