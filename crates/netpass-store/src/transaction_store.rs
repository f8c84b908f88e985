//! Transaction records with a provider-correlation lookup.
//!
//! The reconciler resolves webhooks by the correlation id the provider
//! echoes back, so the store keeps a secondary index from correlation id
//! to transaction id, maintained under the same lock as the records.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use netpass_types::{CorrelationId, NetpassError, Result, Transaction, TransactionId};

use crate::kv::Versioned;

#[derive(Debug)]
struct Inner {
    records: HashMap<TransactionId, Versioned<Transaction>>,
    by_correlation: HashMap<CorrelationId, TransactionId>,
}

/// Store of payment attempts, keyed by id with correlation-id lookup.
#[derive(Debug)]
pub struct TransactionStore {
    inner: RwLock<Inner>,
}

impl TransactionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                by_correlation: HashMap::new(),
            }),
        }
    }

    /// Persist a new transaction, indexing its correlation id if present.
    ///
    /// # Errors
    /// Returns `DuplicateKey` if the id or correlation id is already taken.
    pub fn insert(&self, transaction: Transaction) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.records.contains_key(&transaction.id) {
            return Err(NetpassError::DuplicateKey {
                key: transaction.id.to_string(),
            });
        }
        if let Some(corr) = &transaction.correlation_id {
            if inner.by_correlation.contains_key(corr) {
                return Err(NetpassError::DuplicateKey {
                    key: corr.to_string(),
                });
            }
            inner.by_correlation.insert(corr.clone(), transaction.id);
        }
        inner.records.insert(
            transaction.id,
            Versioned {
                value: transaction,
                version: 1,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<Versioned<Transaction>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(id)
            .cloned()
    }

    /// Resolve a webhook's correlation id to its transaction.
    #[must_use]
    pub fn get_by_correlation(&self, correlation_id: &CorrelationId) -> Option<Versioned<Transaction>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let id = inner.by_correlation.get(correlation_id)?;
        inner.records.get(id).cloned()
    }

    /// Conditionally replace a transaction record. Keeps the correlation
    /// index in step when initiation attaches the id after insert.
    ///
    /// # Errors
    /// - `KeyMissing` if the id is gone
    /// - `VersionConflict` if another writer got there first
    pub fn compare_and_swap(&self, id: &TransactionId, expected: u64, transaction: Transaction) -> Result<u64> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner
            .records
            .get_mut(id)
            .ok_or_else(|| NetpassError::KeyMissing { key: id.to_string() })?;
        if entry.version != expected {
            return Err(NetpassError::VersionConflict { key: id.to_string() });
        }
        let new_correlation = transaction.correlation_id.clone();
        entry.value = transaction;
        entry.version += 1;
        let version = entry.version;
        if let Some(corr) = new_correlation {
            inner.by_correlation.entry(corr).or_insert(*id);
        }
        Ok(version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}
