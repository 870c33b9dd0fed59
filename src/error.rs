//! Error types for the treegen generation engine.

use crate::registry::Kind;
use thiserror::Error;

/// Storage-related errors (materialisation and identity persistence)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Engine errors. Every variant aborts the generation run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not registered: {name}")]
    NotRegistered { kind: Kind, name: String },

    #[error("{kind} '{name}' was already registered")]
    DuplicateRegistration { kind: Kind, name: String },

    #[error("Dependency cycle, generators can never run: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Generator '{generator}' depends on unknown generator '{depends}'")]
    UnknownDependency { generator: String, depends: String },

    #[error("Target node not found: /{}", .0.join("/"))]
    TargetNotFound(Vec<String>),

    #[error("Node '{parent}' already has a child named '{name}'")]
    DuplicateChild { parent: String, name: String },

    #[error("Transform '{0}' provided no source and there is no previous target to continue from")]
    MissingSource(String),

    #[error("No transforms configured")]
    EmptyChain,

    #[error("Handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl EngineError {
    /// Shorthand for handler callbacks reporting their own failures
    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::StorageError(StorageError::IoError(err))
    }
}
