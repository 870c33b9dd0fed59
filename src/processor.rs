//! Processor: runs the generators of one transform in dependency order.

use crate::error::EngineError;
use crate::generator::Generator;
use crate::registry::Registry;
use crate::sorter::{sort_generators, DependencyPolicy};
use crate::target::TargetHandler;
use crate::tree::Tree;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Execution of one transform over a source and target tree
pub struct Processor<'r> {
    registry: &'r Registry,
    transform: String,
    policy: DependencyPolicy,
}

impl<'r> Processor<'r> {
    /// Create a processor for `transform` using the strict dependency policy
    pub fn new(registry: &'r Registry, transform: impl Into<String>) -> Self {
        Self {
            registry,
            transform: transform.into(),
            policy: DependencyPolicy::default(),
        }
    }

    /// Choose how dependencies outside the transform are treated
    pub fn with_policy(mut self, policy: DependencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Name of the transform this processor runs
    pub fn transform(&self) -> &str {
        &self.transform
    }

    /// Generators of this transform in execution order
    ///
    /// Membership is decided by the part of the generator name before the
    /// first `.`, so `fs` never picks up generators of `fsx`.
    pub fn lookup_generators(&self) -> Result<Vec<Arc<Generator>>, EngineError> {
        let generators = self
            .registry
            .generators()
            .iter()
            .filter(|(name, _)| {
                name.split_once('.')
                    .is_some_and(|(transform, _)| transform == self.transform)
            })
            .map(|(_, generator)| Arc::clone(generator))
            .collect();
        sort_generators(generators, self.policy)
    }

    /// Run every generator over `source`, threading `target` through them
    ///
    /// Each generator gets a fresh target handler of the strategy registered
    /// for it, so the anchor always starts at the target root. With no
    /// generators the target is returned unchanged.
    #[instrument(skip_all, fields(transform = %self.transform))]
    pub fn run(&self, source: &Tree, target: Tree) -> Result<Tree, EngineError> {
        let start = Instant::now();
        let generators = self.lookup_generators()?;
        if generators.is_empty() {
            debug!("No generators registered, passing target through");
            return Ok(target);
        }

        let mut target = target;
        for generator in &generators {
            let anchor = self.registry.anchors().get(generator.name())?;
            let mut handler = TargetHandler::new(target, anchor);
            debug!(
                generator = generator.name(),
                anchor = handler.policy_name(),
                "Starting generator"
            );
            generator.run(self.registry, source, &mut handler)?;
            target = handler.into_target();
        }

        info!(
            generators = generators.len(),
            target_nodes = target.len(),
            duration_ms = start.elapsed().as_millis(),
            "Transform processed"
        );
        Ok(target)
    }
}
