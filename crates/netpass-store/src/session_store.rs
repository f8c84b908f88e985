//! Session records with the at-most-one-active-per-voucher invariant.
//!
//! Sessions are keyed by an opaque id; the hot lookup is "the voucher's
//! current Active session", so an active index is maintained under the
//! same lock as the records. Sessions are never deleted — terminated ones
//! stay behind as the audit log, reachable through `latest_for_voucher`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use netpass_types::{NetpassError, Result, Session, SessionId, SessionStatus, VoucherCode};

use crate::kv::Versioned;

#[derive(Debug)]
struct Inner {
    records: HashMap<SessionId, Versioned<Session>>,
    /// The single Active session per voucher, if any.
    active_by_voucher: HashMap<VoucherCode, SessionId>,
    /// All sessions per voucher in creation order (UUIDv7 ids sort by time).
    by_voucher: HashMap<VoucherCode, Vec<SessionId>>,
}

/// Store of redemption sessions.
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                active_by_voucher: HashMap::new(),
                by_voucher: HashMap::new(),
            }),
        }
    }

    /// Persist a new session.
    ///
    /// # Errors
    /// Returns `ActiveSessionExists` if the voucher already has an Active
    /// session — this is the invariant gate and accountant both rely on
    /// for idempotent session creation.
    pub fn insert(&self, session: Session) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if session.status == SessionStatus::Active
            && inner.active_by_voucher.contains_key(&session.voucher)
        {
            return Err(NetpassError::ActiveSessionExists(session.voucher.clone()));
        }
        if inner.records.contains_key(&session.id) {
            return Err(NetpassError::DuplicateKey {
                key: session.id.to_string(),
            });
        }
        if session.status == SessionStatus::Active {
            inner
                .active_by_voucher
                .insert(session.voucher.clone(), session.id);
        }
        inner
            .by_voucher
            .entry(session.voucher.clone())
            .or_default()
            .push(session.id);
        inner.records.insert(
            session.id,
            Versioned {
                value: session,
                version: 1,
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Versioned<Session>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .get(id)
            .cloned()
    }

    /// The voucher's current Active session, if one exists.
    #[must_use]
    pub fn active_for_voucher(&self, voucher: &VoucherCode) -> Option<Versioned<Session>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let id = inner.active_by_voucher.get(voucher)?;
        inner.records.get(id).cloned()
    }

    /// The most recently created session for a voucher, regardless of
    /// state. Backs the status query's usage snapshot.
    #[must_use]
    pub fn latest_for_voucher(&self, voucher: &VoucherCode) -> Option<Session> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let ids = inner.by_voucher.get(voucher)?;
        let id = ids.last()?;
        inner.records.get(id).map(|rec| rec.value.clone())
    }

    /// Conditionally replace a session. Sessions never return to Active,
    /// so the active index only ever shrinks here.
    ///
    /// # Errors
    /// - `KeyMissing` if the id is gone
    /// - `VersionConflict` if another writer got there first
    pub fn compare_and_swap(&self, id: &SessionId, expected: u64, session: Session) -> Result<u64> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner
            .records
            .get_mut(id)
            .ok_or_else(|| NetpassError::KeyMissing { key: id.to_string() })?;
        if entry.version != expected {
            return Err(NetpassError::VersionConflict { key: id.to_string() });
        }
        let voucher = session.voucher.clone();
        let left_active = session.status != SessionStatus::Active;
        entry.value = session;
        entry.version += 1;
        let version = entry.version;
        if left_active && inner.active_by_voucher.get(&voucher) == Some(id) {
            inner.active_by_voucher.remove(&voucher);
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

    /// Number of Active sessions across all vouchers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active_by_voucher
            .len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use netpass_types::ClientId;
    use rust_decimal::Decimal;
    use std::net::{IpAddr, Ipv4Addr};

    fn make_session(code: &str) -> Session {
        let client = ClientId::new("AA:BB:CC:DD:EE:FF", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        Session::new(VoucherCode::new(code), None, &client)
    }

    #[test]
    fn second_active_session_rejected() {
        let store = SessionStore::new();
        store.insert(make_session("AB12-CD34")).unwrap();

        let err = store.insert(make_session("AB12-CD34")).unwrap_err();
        assert!(matches!(err, NetpassError::ActiveSessionExists(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn termination_clears_active_index() {
        let store = SessionStore::new();
        let session = make_session("AB12-CD34");
        let id = session.id;
        let code = session.voucher.clone();
        store.insert(session).unwrap();

        let rec = store.active_for_voucher(&code).unwrap();
        let mut done = rec.value;
        done.terminate(Utc::now()).unwrap();
        store.compare_and_swap(&id, rec.version, done).unwrap();

        assert!(store.active_for_voucher(&code).is_none());
        assert_eq!(store.active_count(), 0);
        // Audit record survives.
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.latest_for_voucher(&code).unwrap().status,
            SessionStatus::Terminated
        );
    }

    #[test]
    fn next_session_allowed_after_termination() {
        let store = SessionStore::new();
        let first = make_session("AB12-CD34");
        let first_id = first.id;
        let code = first.voucher.clone();
        store.insert(first).unwrap();

        let rec = store.get(&first_id).unwrap();
        let mut done = rec.value;
        done.terminate(Utc::now()).unwrap();
        store.compare_and_swap(&first_id, rec.version, done).unwrap();

        store.insert(make_session("AB12-CD34")).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_count(), 1);
        // Latest points at the new session.
        assert_eq!(
            store.latest_for_voucher(&code).unwrap().status,
            SessionStatus::Active
        );
    }

    #[test]
    fn stale_usage_write_loses() {
        let store = SessionStore::new();
        let session = make_session("AB12-CD34");
        let id = session.id;
        store.insert(session).unwrap();

        let rec = store.get(&id).unwrap();
        let mut a = rec.value.clone();
        a.record_usage(Decimal::from(100u64), Decimal::from(5u64), Utc::now());
        store.compare_and_swap(&id, rec.version, a).unwrap();

        let mut b = rec.value;
        b.record_usage(Decimal::from(80u64), Decimal::from(6u64), Utc::now());
        let err = store.compare_and_swap(&id, rec.version, b).unwrap_err();
        assert!(matches!(err, NetpassError::VersionConflict { .. }));
        assert_eq!(store.get(&id).unwrap().value.data_used_mb, Decimal::from(100u64));
    }
}
