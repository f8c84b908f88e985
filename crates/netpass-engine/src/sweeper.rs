//! The expiry sweeper: batch retirement of lapsed vouchers.
//!
//! The gate and the status query already treat a lapsed Active voucher as
//! expired, so the sweep only reconciles stored status with the clock for
//! vouchers nobody touched. It runs on a schedule chosen by the host, not
//! by this crate.

use chrono::{DateTime, Utc};
use netpass_store::VoucherStore;
use netpass_types::NetpassError;

/// Flip every stored-Active voucher whose deadline has passed to Expired.
/// Returns how many vouchers this sweep retired.
///
/// Each flip is an independent compare-and-set: a voucher redeemed or
/// already retired between the scan and the flip is simply skipped, and a
/// failed flip never aborts the rest of the batch.
pub fn sweep_expired(vouchers: &VoucherStore, now: DateTime<Utc>) -> usize {
    let stale = vouchers.stale_active_codes(now);
    let mut swept = 0;

    for code in stale {
        let Some(record) = vouchers.get(&code) else {
            continue;
        };
        let mut voucher = record.value;
        if !(voucher.status == netpass_types::VoucherStatus::Active && voucher.is_expired_at(now)) {
            continue;
        }
        let Ok(()) = voucher.mark_expired() else {
            continue;
        };
        match vouchers.compare_and_swap(&code, record.version, voucher) {
            Ok(_) => swept += 1,
            // Someone redeemed or retired it mid-sweep; their write stands.
            Err(NetpassError::VersionConflict { .. } | NetpassError::KeyMissing { .. }) => {}
            Err(err) => {
                tracing::warn!(%code, %err, "expiry sweep skipped voucher");
            }
        }
    }

    if swept > 0 {
        tracing::info!(swept, "expiry sweep retired lapsed vouchers");
    }
    swept
}
