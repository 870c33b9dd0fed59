//! Handler: the smallest unit of generation logic.

use crate::error::EngineError;
use crate::registry::Registry;
use crate::target::TargetHandler;
use crate::tree::SourceNode;
use std::fmt;
use std::sync::Arc;

/// Execution rank of a handler within its generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    /// Runs before unordered handlers, ascending
    At(u32),
    /// Runs after every ranked handler, in registration order
    Unordered,
}

impl Rank {
    /// Map a declared order to a rank; negative values mean "unordered"
    pub fn from_order(order: i64) -> Self {
        if order < 0 {
            Rank::Unordered
        } else {
            Rank::At(u32::try_from(order).unwrap_or(u32::MAX))
        }
    }
}

impl Default for Rank {
    fn default() -> Self {
        Rank::Unordered
    }
}

impl From<i64> for Rank {
    fn from(order: i64) -> Self {
        Rank::from_order(order)
    }
}

/// What a handler sees of the current traversal step
pub struct Visit<'a> {
    pub registry: &'a Registry,
    pub source: SourceNode<'a>,
    /// Qualified name of the running handler
    pub handler: &'a str,
}

/// Handler callback
pub type HandlerFn =
    Arc<dyn Fn(&Visit<'_>, &mut TargetHandler) -> Result<(), EngineError> + Send + Sync>;

/// Callback bound to one generator, optionally gated by a scope
#[derive(Clone)]
pub struct Handler {
    name: String,
    scope: Option<String>,
    rank: Rank,
    callback: HandlerFn,
}

impl Handler {
    /// Create an unscoped, unordered handler named `<transform>.<generator>.<name>`
    pub fn new<F>(transform: &str, generator: &str, name: &str, callback: F) -> Self
    where
        F: Fn(&Visit<'_>, &mut TargetHandler) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        Self {
            name: format!("{}.{}.{}", transform, generator, name),
            scope: None,
            rank: Rank::Unordered,
            callback: Arc::new(callback),
        }
    }

    /// Restrict the handler to nodes matching the (bare) scope name
    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn ranked(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn call(
        &self,
        registry: &Registry,
        source: SourceNode<'_>,
        target: &mut TargetHandler,
    ) -> Result<(), EngineError> {
        let visit = Visit {
            registry,
            source,
            handler: &self.name,
        };
        (self.callback)(&visit, target)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("rank", &self.rank)
            .finish()
    }
}
