//! Persistence layer for the identity store

use crate::error::StorageError;
use crate::store::{IdentityMap, IdentityStore};
use crate::types::Identity;
use std::path::Path;

/// Sled-based implementation of IdentityStore
///
/// Keys are the 32 raw bytes of the source identity, values the
/// bincode-encoded target identity.
pub struct SledIdentityStore {
    db: sled::Db,
}

impl SledIdentityStore {
    /// Open (or create) a store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Target identity recorded for a single source identity
    pub fn get(&self, source: &Identity) -> Result<Option<Identity>, StorageError> {
        match self.db.get(source.as_bytes()).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to get identity mapping: {}", e),
            ))
        })? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush database: {}", e),
            ))
        })?;
        Ok(())
    }
}

impl IdentityStore for SledIdentityStore {
    fn load(&self) -> Result<IdentityMap, StorageError> {
        let mut map = IdentityMap::new();
        for item in self.db.iter() {
            let (key, value) = item.map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to iterate store: {}", e),
                ))
            })?;
            let source: [u8; 32] = <[u8; 32]>::try_from(&key[..]).map_err(|_| {
                StorageError::Store(format!("Unexpected key of {} bytes in identity store", key.len()))
            })?;
            map.insert(Identity(source), decode(&value)?);
        }
        Ok(map)
    }

    fn save(&self, map: &IdentityMap) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        for item in self.db.iter().keys() {
            let key = item.map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to iterate store: {}", e),
                ))
            })?;
            let stale = <[u8; 32]>::try_from(&key[..])
                .map(|bytes| !map.contains_key(&Identity(bytes)))
                .unwrap_or(true);
            if stale {
                batch.remove(key);
            }
        }

        for (source, target) in map {
            let value = bincode::serialize(target).map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Failed to serialize identity: {}", e),
                ))
            })?;
            batch.insert(source.as_bytes().as_slice(), value);
        }

        self.db.apply_batch(batch).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to apply batch: {}", e),
            ))
        })?;
        self.flush()
    }
}

fn decode(value: &[u8]) -> Result<Identity, StorageError> {
    bincode::deserialize(value).map_err(|e| {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to deserialize identity: {}", e),
        ))
    })
}
