//! treegen: Chain-of-Transforms Tree Generation
//!
//! A source tree is walked by the generators of each transform in
//! dependency order. Every node is dispatched to the handlers of the running
//! generator, which write into a target tree through an anchor cursor. The
//! final target tree materializes itself, for example as a directory.

pub mod cli;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod flavour;
pub mod generator;
pub mod handler;
pub mod logging;
pub mod processor;
pub mod registry;
pub mod scope;
pub mod sorter;
pub mod store;
pub mod target;
pub mod token;
pub mod tree;
pub mod types;

pub use controller::{Controller, Transform};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{EngineError, StorageError};
pub use generator::{Dependency, Generator};
pub use handler::{Handler, Rank, Visit};
pub use processor::Processor;
pub use registry::{Kind, Registry};
pub use scope::Scope;
pub use sorter::{sort_generators, DependencyPolicy};
pub use target::{AnchorPolicy, NullAnchor, TargetHandler, TreeSync};
pub use token::{Token, TokenStore};
pub use tree::{Materialize, NodeId, SourceNode, Tree};
pub use types::Identity;
