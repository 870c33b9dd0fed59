//! Dispatcher: resolves, orders and runs the handlers of one generator.

use crate::error::EngineError;
use crate::handler::{Handler, Rank};
use crate::registry::Registry;
use crate::target::TargetHandler;
use crate::tree::SourceNode;
use std::sync::Arc;
use tracing::{error, trace};

/// Dispatch strategy, registered per generator
pub trait Dispatch: Send + Sync {
    fn dispatch(
        &self,
        registry: &Registry,
        source: SourceNode<'_>,
        target: &mut TargetHandler,
    ) -> Result<(), EngineError>;
}

/// Default dispatcher
///
/// Handler membership is resolved from the registry on every call; nothing
/// is cached, so handlers registered late still take part.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    generator: String,
    transform: String,
    prefix: String,
}

impl Dispatcher {
    /// Create a dispatcher for the qualified generator name `<transform>.<generator>`
    pub fn new(generator: &str) -> Self {
        let transform = generator
            .split_once('.')
            .map(|(transform, _)| transform)
            .unwrap_or(generator)
            .to_string();
        Self {
            generator: generator.to_string(),
            transform,
            prefix: format!("{}.", generator),
        }
    }

    /// Qualified name of the generator whose handlers are dispatched
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Handlers of this generator in execution order: explicit ranks
    /// ascending (ties in registration order), then unordered handlers in
    /// registration order
    pub fn lookup_handlers(&self, registry: &Registry) -> Vec<Arc<Handler>> {
        let mut ranked = Vec::new();
        let mut unordered = Vec::new();
        for (_, handler) in registry.handlers().with_prefix(&self.prefix) {
            match handler.rank() {
                Rank::At(rank) => ranked.push((rank, Arc::clone(handler))),
                Rank::Unordered => unordered.push(Arc::clone(handler)),
            }
        }
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked
            .into_iter()
            .map(|(_, handler)| handler)
            .chain(unordered)
            .collect()
    }
}

impl Dispatch for Dispatcher {
    fn dispatch(
        &self,
        registry: &Registry,
        source: SourceNode<'_>,
        target: &mut TargetHandler,
    ) -> Result<(), EngineError> {
        for handler in self.lookup_handlers(registry) {
            if let Some(scope) = handler.scope() {
                let scope = registry
                    .scopes()
                    .get(&format!("{}.{}", self.transform, scope))?;
                if !scope.matches(&source) {
                    trace!(handler = handler.name(), node = ?source, "Scope does not match, skipping");
                    continue;
                }
            }

            trace!(handler = handler.name(), node = ?source, "Running handler");
            if let Err(e) = handler.call(registry, source, target) {
                error!(handler = handler.name(), node = ?source, "Handler failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}
