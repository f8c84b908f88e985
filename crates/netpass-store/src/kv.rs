//! Versioned key-value map with per-key compare-and-set.
//!
//! This is the concurrency primitive the whole engine builds on: every
//! record carries a monotonically increasing version, reads clone the
//! record out together with its version, and writes only land when the
//! expected version still matches. Per-key serialization of mutations
//! follows directly — two racing writers cannot both succeed, and the
//! loser re-reads to observe the post-race state.
//!
//! Insert rejects duplicates instead of overwriting, which is what lets
//! the code generator treat insert failure as a collision signal.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use netpass_types::{NetpassError, Result};

/// A record together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// A concurrent map exposing atomic conditional updates per key.
#[derive(Debug)]
pub struct CasMap<K, V> {
    inner: RwLock<HashMap<K, Versioned<V>>>,
}

impl<K, V> CasMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh record at version 1.
    ///
    /// # Errors
    /// Returns `DuplicateKey` if the key is already present — existing
    /// records are never silently overwritten.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&key) {
            return Err(NetpassError::DuplicateKey {
                key: key.to_string(),
            });
        }
        map.insert(key, Versioned { value, version: 1 });
        Ok(())
    }

    /// Clone the record out together with its current version.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Versioned<V>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Replace the record only if its version still equals `expected`.
    /// Returns the new version on success.
    ///
    /// # Errors
    /// - `KeyMissing` if the key is gone
    /// - `VersionConflict` if another writer got there first
    pub fn compare_and_swap(&self, key: &K, expected: u64, value: V) -> Result<u64> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = map.get_mut(key).ok_or_else(|| NetpassError::KeyMissing {
            key: key.to_string(),
        })?;
        if entry.version != expected {
            return Err(NetpassError::VersionConflict {
                key: key.to_string(),
            });
        }
        entry.value = value;
        entry.version += 1;
        Ok(entry.version)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Snapshot of all keys, for sweep-style iteration.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for CasMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
