//! Identity store
//!
//! Persists the source → target identity map between runs so a later run
//! can find the target nodes an earlier run generated.

pub mod persistence;

pub use persistence::SledIdentityStore;

use crate::error::StorageError;
use crate::types::Identity;
use std::collections::BTreeMap;

/// Source identity → target identity
pub type IdentityMap = BTreeMap<Identity, Identity>;

/// Identity store interface
pub trait IdentityStore {
    /// Every mapping persisted so far; empty for a fresh store
    fn load(&self) -> Result<IdentityMap, StorageError>;

    /// Replace the persisted map with `map`
    fn save(&self, map: &IdentityMap) -> Result<(), StorageError>;
}
