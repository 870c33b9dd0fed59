//! Controller: runs the configured chain of transforms once.
//!
//! Every stage builds its target tree from the output location. Its source
//! is either built fresh from the source paths or, when the transform
//! returns no source, the previous stage's target. Only the final target is
//! materialized.

use crate::error::EngineError;
use crate::registry::Registry;
use crate::processor::Processor;
use crate::sorter::DependencyPolicy;
use crate::store::{IdentityMap, IdentityStore};
use crate::target::{identity_map, seed_identity_map};
use crate::tree::Tree;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// One stage of the chain
pub trait Transform: Send + Sync {
    /// Registry name; generators of this transform are named `<name>.<generator>`
    fn name(&self) -> &str;

    /// Build the source tree, or `None` to continue from the previous target
    fn source(&self, paths: &[PathBuf]) -> Result<Option<Tree>, EngineError>;

    /// Build the (usually empty) target tree rooted at `path`
    fn target(&self, path: &Path) -> Result<Tree, EngineError>;
}

/// Runs a chain of registered transforms
pub struct Controller<'r> {
    registry: &'r Registry,
    chain: Vec<String>,
    policy: DependencyPolicy,
    identity_store: Option<Box<dyn IdentityStore>>,
}

impl<'r> Controller<'r> {
    /// Create a controller running the named transforms in order
    ///
    /// Nothing is checked until `run`; an empty or unknown chain fails there.
    pub fn new<I, S>(registry: &'r Registry, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registry,
            chain: chain.into_iter().map(Into::into).collect(),
            policy: DependencyPolicy::default(),
            identity_store: None,
        }
    }

    /// Dependency policy handed to every processor of the chain
    pub fn with_policy(mut self, policy: DependencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Persist the identity map across runs
    pub fn with_identity_store(mut self, store: Box<dyn IdentityStore>) -> Self {
        self.identity_store = Some(store);
        self
    }

    /// Transform names in execution order
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Run every transform of the chain, materialize and return the final target
    #[instrument(skip_all, fields(chain = %self.chain.join(" -> ")))]
    pub fn run(&self, source_paths: &[PathBuf], target_path: &Path) -> Result<Tree, EngineError> {
        let start = Instant::now();
        if self.chain.is_empty() {
            return Err(EngineError::EmptyChain);
        }

        if let Some(store) = &self.identity_store {
            let seeded = store.load()?;
            debug!(mappings = seeded.len(), "Seeding identity map");
            seed_identity_map(self.registry, &seeded)?;
        }

        let mut previous: Option<Tree> = None;
        for name in &self.chain {
            let transform = self.registry.transforms().get(name)?;
            let source = match transform.source(source_paths)? {
                Some(source) => source,
                None => previous
                    .take()
                    .ok_or_else(|| EngineError::MissingSource(name.clone()))?,
            };
            let target = transform.target(target_path)?;

            debug!(
                transform = %name,
                source = source.label(),
                source_nodes = source.len(),
                "Running transform"
            );
            let target = Processor::new(self.registry, name.as_str())
                .with_policy(self.policy)
                .run(&source, target)?;
            previous = Some(target);
        }

        let target = previous.ok_or(EngineError::EmptyChain)?;
        target.materialize()?;

        if let Some(store) = &self.identity_store {
            let map = live_identities(self.registry, &target);
            store.save(&map)?;
            debug!(mappings = map.len(), "Saved identity map");
        }

        info!(
            transforms = self.chain.len(),
            target_nodes = target.len(),
            duration_ms = start.elapsed().as_millis(),
            "Generation run completed"
        );
        Ok(target)
    }
}

/// Mappings whose target node is part of the final tree
///
/// Entries for source nodes that disappeared since the last run point at
/// target nodes that were never built this time, so they drop out here.
fn live_identities(registry: &Registry, target: &Tree) -> IdentityMap {
    identity_map(registry)
        .into_iter()
        .filter(|(_, generated)| target.find_by_identity(generated).is_some())
        .collect()
}
