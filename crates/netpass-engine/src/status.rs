//! Voucher status queries, with check-on-read expiry.
//!
//! Status is computed, not just fetched: an Active voucher past its
//! deadline answers Expired even before the sweeper or the gate has
//! persisted the flip. The read itself never writes.

use chrono::{DateTime, Utc};
use netpass_store::{PlanCatalog, SessionStore, VoucherStore};
use netpass_types::{NetpassError, Result, SessionStatus, VoucherCode, VoucherStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// Usage drawn from the voucher's most recent session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUsage {
    pub status: SessionStatus,
    pub data_used_mb: Decimal,
    pub time_used_min: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Everything a holder can learn about their voucher.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub code: VoucherCode,
    /// Effective status: stored status corrected for the clock.
    pub status: VoucherStatus,
    pub plan_name: String,
    pub data_limit_mb: u64,
    pub time_limit_min: u64,
    pub data_used_mb: Decimal,
    pub time_used_min: Decimal,
    pub expires_at: DateTime<Utc>,
    /// The latest session, live or finished, if the voucher ever had one.
    pub session: Option<SessionUsage>,
}

/// Snapshot a voucher's effective state at `now`.
///
/// # Errors
/// - `VoucherNotFound` if no voucher carries the code
/// - `PlanNotFound` if the voucher's plan reference dangles
pub fn snapshot(
    plans: &PlanCatalog,
    vouchers: &VoucherStore,
    sessions: &SessionStore,
    code: &VoucherCode,
    now: DateTime<Utc>,
) -> Result<StatusSnapshot> {
    let voucher = vouchers
        .get(code)
        .ok_or_else(|| NetpassError::VoucherNotFound(code.clone()))?
        .value;
    let plan = plans.get(voucher.plan)?;

    let status = if voucher.status == VoucherStatus::Active && voucher.is_expired_at(now) {
        VoucherStatus::Expired
    } else {
        voucher.status
    };

    let session = sessions.latest_for_voucher(code).map(|s| SessionUsage {
        status: s.status,
        data_used_mb: s.data_used_mb,
        time_used_min: s.time_used_min,
        start_time: s.start_time,
        end_time: s.end_time,
    });

    Ok(StatusSnapshot {
        code: voucher.code,
        status,
        plan_name: plan.name,
        data_limit_mb: plan.data_limit_mb,
        time_limit_min: plan.time_limit_min,
        data_used_mb: voucher.data_used_mb,
        time_used_min: voucher.time_used_min,
        expires_at: voucher.expires_at,
        session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use netpass_types::{ClientId, Plan, Session, Voucher};

    fn setup() -> (PlanCatalog, VoucherStore, SessionStore, Plan) {
        let plans = PlanCatalog::new();
        let plan = Plan::dummy_standard();
        plans.insert(plan.clone()).unwrap();
        (plans, VoucherStore::new(), SessionStore::new(), plan)
    }

    #[test]
    fn fresh_voucher_reports_active() {
        let (plans, vouchers, sessions, plan) = setup();
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();

        let snap = snapshot(
            &plans,
            &vouchers,
            &sessions,
            &VoucherCode::new("AB12-CD34"),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(snap.status, VoucherStatus::Active);
        assert_eq!(snap.plan_name, "Standard");
        assert_eq!(snap.data_limit_mb, 1024);
        assert!(snap.session.is_none());
    }

    #[test]
    fn lapsed_voucher_reports_expired_without_write() {
        let (plans, vouchers, sessions, plan) = setup();
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();
        let code = VoucherCode::new("AB12-CD34");

        let later = Utc::now() + chrono::Duration::hours(48);
        let snap = snapshot(&plans, &vouchers, &sessions, &code, later).unwrap();
        assert_eq!(snap.status, VoucherStatus::Expired);

        // The read did not persist the flip.
        assert_eq!(vouchers.get(&code).unwrap().value.status, VoucherStatus::Active);
    }

    #[test]
    fn latest_session_included() {
        let (plans, vouchers, sessions, plan) = setup();
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();
        let code = VoucherCode::new("AB12-CD34");
        let client = ClientId::new("AA:BB:CC:DD:EE:FF", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        sessions.insert(Session::new(code.clone(), None, &client)).unwrap();

        let snap = snapshot(&plans, &vouchers, &sessions, &code, Utc::now()).unwrap();
        let usage = snap.session.expect("session usage present");
        assert_eq!(usage.status, SessionStatus::Active);
        assert!(usage.end_time.is_none());
    }

    #[test]
    fn unknown_code_errors() {
        let (plans, vouchers, sessions, _) = setup();
        let err = snapshot(
            &plans,
            &vouchers,
            &sessions,
            &VoucherCode::new("ZZZZ-0000"),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, NetpassError::VoucherNotFound(_)));
    }
}
