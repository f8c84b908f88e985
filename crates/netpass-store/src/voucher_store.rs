//! The authoritative record of issued credentials.
//!
//! Keyed by the globally unique voucher code. Uniqueness is enforced here,
//! at insert, so the generate-and-check loop in issuance cannot race past
//! a collision: the second insert of the same code fails and the issuer
//! retries with a fresh one.

use chrono::{DateTime, Utc};
use netpass_types::{NetpassError, Result, Voucher, VoucherCode, VoucherStatus};

use crate::kv::{CasMap, Versioned};

/// Store of all vouchers ever issued, active and terminal alike.
///
/// Codes are never reused, so terminal vouchers stay in the map — the
/// uniqueness invariant spans the system's whole lifetime, not just the
/// active set.
#[derive(Debug)]
pub struct VoucherStore {
    vouchers: CasMap<VoucherCode, Voucher>,
}

impl VoucherStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vouchers: CasMap::new(),
        }
    }

    /// Persist a freshly issued voucher.
    ///
    /// # Errors
    /// Returns `DuplicateCode` if the code is already taken.
    pub fn insert(&self, voucher: Voucher) -> Result<()> {
        let code = voucher.code.clone();
        self.vouchers.insert(code.clone(), voucher).map_err(|err| {
            if matches!(err, NetpassError::DuplicateKey { .. }) {
                NetpassError::DuplicateCode(code)
            } else {
                err
            }
        })
    }

    /// Clone the voucher out with its version for a read-modify-CAS cycle.
    #[must_use]
    pub fn get(&self, code: &VoucherCode) -> Option<Versioned<Voucher>> {
        self.vouchers.get(code)
    }

    /// Conditionally replace a voucher. See [`CasMap::compare_and_swap`].
    pub fn compare_and_swap(&self, code: &VoucherCode, expected: u64, voucher: Voucher) -> Result<u64> {
        self.vouchers.compare_and_swap(code, expected, voucher)
    }

    /// Uniqueness probe for the code generator.
    #[must_use]
    pub fn contains(&self, code: &VoucherCode) -> bool {
        self.vouchers.contains(code)
    }

    /// Snapshot of all codes, for the expiry sweep.
    #[must_use]
    pub fn codes(&self) -> Vec<VoucherCode> {
        self.vouchers.keys()
    }

    /// Codes of stored-Active vouchers whose deadline has passed at `now`.
    #[must_use]
    pub fn stale_active_codes(&self, now: DateTime<Utc>) -> Vec<VoucherCode> {
        self.vouchers
            .keys()
            .into_iter()
            .filter(|code| {
                self.vouchers.get(code).is_some_and(|rec| {
                    rec.value.status == VoucherStatus::Active && rec.value.is_expired_at(now)
                })
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vouchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vouchers.is_empty()
    }
}

impl Default for VoucherStore {
    fn default() -> Self {
        Self::new()
    }
}
