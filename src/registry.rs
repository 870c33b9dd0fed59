//! Registry: named lookup of every pluggable engine component.
//!
//! One catalog per capability kind. Names follow `<transform>.<generator>`
//! for generators, dispatchers and target handlers, `<transform>.<scope>`
//! for scopes and `<transform>.<generator>.<handler>` for handlers. The
//! registry is built once during configuration (`&mut`) and then shared
//! read-only (`&`) by every layer of a run; only the token store mutates
//! afterwards.

use crate::controller::Transform;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::EngineError;
use crate::generator::Generator;
use crate::handler::Handler;
use crate::scope::Scope;
use crate::target::{AnchorPolicy, NullAnchor};
use crate::token::TokenStore;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Capability kind of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Transform,
    Generator,
    Dispatcher,
    TargetHandler,
    Scope,
    Handler,
    Token,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Transform => "Transform",
            Kind::Generator => "Generator",
            Kind::Dispatcher => "Dispatcher",
            Kind::TargetHandler => "Target handler",
            Kind::Scope => "Scope",
            Kind::Handler => "Handler",
            Kind::Token => "Token",
        };
        f.write_str(name)
    }
}

/// Register-once catalog of one capability kind, in registration order
pub struct Catalog<T: ?Sized> {
    kind: Kind,
    entries: Vec<(String, Arc<T>)>,
    index: HashMap<String, usize>,
}

impl<T: ?Sized> Catalog<T> {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Register an entry; a name can only be registered once
    pub fn register(&mut self, name: impl Into<String>, item: Arc<T>) -> Result<(), EngineError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(EngineError::DuplicateRegistration {
                kind: self.kind,
                name,
            });
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, item));
        Ok(())
    }

    /// Look up an entry or fail with a registry lookup error
    pub fn get(&self, name: &str) -> Result<Arc<T>, EngineError> {
        self.find(name)
            .cloned()
            .ok_or_else(|| EngineError::NotRegistered {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn find(&self, name: &str) -> Option<&Arc<T>> {
        self.index.get(name).map(|position| &self.entries[*position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        self.entries.iter().map(|(name, item)| (name.as_str(), item))
    }

    /// Entries whose name starts with `prefix`, in registration order
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Arc<T>)> + 'a {
        self.iter().filter(move |(name, _)| name.starts_with(prefix))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-wide (or per-test) registry of engine components
pub struct Registry {
    transforms: Catalog<dyn Transform>,
    generators: Catalog<Generator>,
    dispatchers: Catalog<dyn Dispatch>,
    anchors: Catalog<dyn AnchorPolicy>,
    scopes: Catalog<Scope>,
    handlers: Catalog<Handler>,
    tokens: TokenStore,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            transforms: Catalog::new(Kind::Transform),
            generators: Catalog::new(Kind::Generator),
            dispatchers: Catalog::new(Kind::Dispatcher),
            anchors: Catalog::new(Kind::TargetHandler),
            scopes: Catalog::new(Kind::Scope),
            handlers: Catalog::new(Kind::Handler),
            tokens: TokenStore::new(),
        }
    }

    pub fn transforms(&self) -> &Catalog<dyn Transform> {
        &self.transforms
    }

    pub fn generators(&self) -> &Catalog<Generator> {
        &self.generators
    }

    pub fn dispatchers(&self) -> &Catalog<dyn Dispatch> {
        &self.dispatchers
    }

    /// Target handler strategies, keyed like their generator
    pub fn anchors(&self) -> &Catalog<dyn AnchorPolicy> {
        &self.anchors
    }

    pub fn scopes(&self) -> &Catalog<Scope> {
        &self.scopes
    }

    pub fn handlers(&self) -> &Catalog<Handler> {
        &self.handlers
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Enumerate registered names of one capability kind
    pub fn names(&self, kind: Kind) -> Vec<String> {
        match kind {
            Kind::Transform => self.transforms.names(),
            Kind::Generator => self.generators.names(),
            Kind::Dispatcher => self.dispatchers.names(),
            Kind::TargetHandler => self.anchors.names(),
            Kind::Scope => self.scopes.names(),
            Kind::Handler => self.handlers.names(),
            Kind::Token => self.tokens.names(),
        }
    }

    pub fn register_transform(&mut self, transform: Arc<dyn Transform>) -> Result<(), EngineError> {
        let name = transform.name().to_string();
        debug!(transform = %name, "Registering transform");
        self.transforms.register(name, transform)
    }

    /// Register a generator with the default dispatcher and a no-op target handler
    pub fn register_generator(&mut self, generator: Generator) -> Result<(), EngineError> {
        self.register_generator_with(generator, Arc::new(NullAnchor), None)
    }

    /// Register a generator together with its target handler strategy and
    /// (optionally) a custom dispatcher
    ///
    /// All three names are checked before anything is inserted, so a
    /// rejected registration leaves the registry untouched.
    pub fn register_generator_with(
        &mut self,
        generator: Generator,
        anchor: Arc<dyn AnchorPolicy>,
        dispatcher: Option<Arc<dyn Dispatch>>,
    ) -> Result<(), EngineError> {
        let name = generator.name().to_string();
        for (kind, taken) in [
            (Kind::Generator, self.generators.contains(&name)),
            (Kind::Dispatcher, self.dispatchers.contains(&name)),
            (Kind::TargetHandler, self.anchors.contains(&name)),
        ] {
            if taken {
                return Err(EngineError::DuplicateRegistration { kind, name });
            }
        }

        let dispatcher = dispatcher.unwrap_or_else(|| Arc::new(Dispatcher::new(&name)));
        debug!(
            generator = %name,
            depends = %generator.depends(),
            anchor = anchor.name(),
            "Registering generator"
        );
        self.generators.register(name.clone(), Arc::new(generator))?;
        self.dispatchers.register(name.clone(), dispatcher)?;
        self.anchors.register(name, anchor)
    }

    pub fn register_scope(&mut self, scope: Scope) -> Result<(), EngineError> {
        let name = scope.name().to_string();
        self.scopes.register(name, Arc::new(scope))
    }

    pub fn register_handler(&mut self, handler: Handler) -> Result<(), EngineError> {
        let name = handler.name().to_string();
        self.handlers.register(name, Arc::new(handler))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("transforms", &self.transforms.names())
            .field("generators", &self.generators.names())
            .field("scopes", &self.scopes.names())
            .field("handlers", &self.handlers.names())
            .field("tokens", &self.tokens.names())
            .finish()
    }
}
