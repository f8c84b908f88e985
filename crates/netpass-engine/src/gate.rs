//! The access gate: credential validation at the network edge.
//!
//! This is the only place a voucher flips Active → Used, and the flip is
//! a compare-and-set, so two clients presenting the same code at the same
//! instant resolve to exactly one winner. The loser re-reads and is
//! rejected from post-race state, the same answer any later redeemer gets.
//!
//! Expiry is evaluated against the clock here, not against stored status:
//! a voucher past its deadline is rejected even if the sweeper has not
//! visited it yet, and the gate flips it to Expired as a side effect.

use chrono::Utc;
use netpass_store::{PlanCatalog, SessionStore, VoucherStore};
use netpass_types::{
    ClientId, EngineConfig, NetpassError, Result, Session, SessionId, VoucherCode, VoucherStatus,
};

/// A redemption attempt as presented by the gateway.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub code: VoucherCode,
    pub client: ClientId,
}

/// Why a redemption was refused. The `Display` string is what the gateway
/// shows the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No voucher carries this code.
    InvalidCredential,
    /// The voucher is in a terminal state.
    UsedOrExpired,
    /// The redemption deadline passed before this attempt.
    Expired,
    /// Reported usage already met the plan's quota.
    QuotaExhausted,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredential => write!(f, "invalid credential"),
            Self::UsedOrExpired => write!(f, "used or expired"),
            Self::Expired => write!(f, "expired"),
            Self::QuotaExhausted => write!(f, "quota exhausted"),
        }
    }
}

/// The gate's answer to a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Grant access under the plan's limits, in gateway units.
    Accept {
        session_id: SessionId,
        /// Time allowance in seconds.
        session_secs: u64,
        /// Data allowance in bytes.
        data_bytes: u64,
    },
    Reject { reason: RejectReason },
}

impl AccessDecision {
    fn reject(reason: RejectReason) -> Self {
        Self::Reject { reason }
    }
}

/// Validates credentials and opens sessions.
#[derive(Debug)]
pub struct AccessGate {
    config: EngineConfig,
}

impl AccessGate {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Decide a redemption attempt.
    ///
    /// Never errors toward the gateway: every failure path maps to a
    /// `Reject` with a reason. Internal store errors are surfaced so the
    /// facade can log them.
    ///
    /// # Errors
    /// Only on data-integrity faults (a voucher whose plan reference
    /// dangles, a session index inconsistency) — never for an ordinary
    /// rejection.
    pub fn authenticate(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        sessions: &SessionStore,
        request: &AccessRequest,
    ) -> Result<AccessDecision> {
        loop {
            let Some(record) = vouchers.get(&request.code) else {
                tracing::info!(code = %request.code, "redemption rejected: unknown code");
                return Ok(AccessDecision::reject(RejectReason::InvalidCredential));
            };
            let voucher = record.value;
            let now = Utc::now();

            // Clock beats stored status: a lapsed Active voucher is
            // retired here, ahead of the sweeper.
            if voucher.status == VoucherStatus::Active && voucher.is_expired_at(now) {
                let mut expired = voucher.clone();
                expired.mark_expired()?;
                match vouchers.compare_and_swap(&request.code, record.version, expired) {
                    Ok(_) => {
                        tracing::info!(code = %request.code, "redemption rejected: deadline passed");
                        return Ok(AccessDecision::reject(RejectReason::Expired));
                    }
                    Err(NetpassError::VersionConflict { .. }) => continue,
                    Err(err) => return Err(err),
                }
            }

            if voucher.status != VoucherStatus::Active {
                tracing::info!(code = %request.code, status = %voucher.status, "redemption rejected");
                return Ok(AccessDecision::reject(RejectReason::UsedOrExpired));
            }

            let plan = plans.get(voucher.plan)?;
            if self.config.enforce_quota_at_gate && voucher.is_exhausted(&plan) {
                tracing::info!(code = %request.code, "redemption rejected: quota exhausted");
                return Ok(AccessDecision::reject(RejectReason::QuotaExhausted));
            }

            let mut winner = voucher.clone();
            winner.mark_used(now)?;
            winner.bind_client(&request.client)?;
            match vouchers.compare_and_swap(&request.code, record.version, winner.clone()) {
                Ok(_) => {
                    let session_id = self.open_session(sessions, &winner, &request.client)?;
                    tracing::info!(
                        code = %request.code,
                        session = %session_id,
                        mac = %request.client.mac_address,
                        "redemption accepted"
                    );
                    return Ok(AccessDecision::Accept {
                        session_id,
                        session_secs: plan.time_limit_secs(),
                        data_bytes: plan.data_limit_bytes(),
                    });
                }
                // Lost the race; answer from post-race state.
                Err(NetpassError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Open the session backing an accepted redemption. If a racing Start
    /// report already opened one for this voucher, reuse it.
    fn open_session(
        &self,
        sessions: &SessionStore,
        voucher: &netpass_types::Voucher,
        client: &ClientId,
    ) -> Result<SessionId> {
        let session = Session::new(voucher.code.clone(), voucher.payer, client);
        let id = session.id;
        match sessions.insert(session) {
            Ok(()) => Ok(id),
            Err(NetpassError::ActiveSessionExists(code)) => sessions
                .active_for_voucher(&code)
                .map(|rec| rec.value.id)
                .ok_or_else(|| {
                    NetpassError::Internal(format!("active session for {code} vanished mid-open"))
                }),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use netpass_types::{Plan, Voucher};
    use rust_decimal::Decimal;

    fn client(last: u8) -> ClientId {
        ClientId::new(
            "AA:BB:CC:DD:EE:FF",
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)),
        )
    }

    fn setup() -> (AccessGate, PlanCatalog, VoucherStore, SessionStore, Plan) {
        let plans = PlanCatalog::new();
        let plan = Plan::dummy_standard();
        plans.insert(plan.clone()).unwrap();
        (
            AccessGate::new(EngineConfig::default()),
            plans,
            VoucherStore::new(),
            SessionStore::new(),
            plan,
        )
    }

    fn request(code: &str) -> AccessRequest {
        AccessRequest {
            code: VoucherCode::new(code),
            client: client(7),
        }
    }

    #[test]
    fn valid_voucher_accepted_and_bound() {
        let (gate, plans, vouchers, sessions, plan) = setup();
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();

        let decision = gate
            .authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        let AccessDecision::Accept {
            session_secs,
            data_bytes,
            ..
        } = decision
        else {
            panic!("expected acceptance, got {decision:?}");
        };
        assert_eq!(session_secs, 240 * 60);
        assert_eq!(data_bytes, 1024 * 1024 * 1024);

        let stored = vouchers.get(&VoucherCode::new("AB12-CD34")).unwrap().value;
        assert_eq!(stored.status, VoucherStatus::Used);
        assert!(stored.used_at.is_some());
        assert_eq!(stored.mac_address.unwrap().as_str(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(sessions.active_count(), 1);
    }

    #[test]
    fn unknown_code_is_invalid_credential() {
        let (gate, plans, vouchers, sessions, _) = setup();
        let decision = gate
            .authenticate(&plans, &vouchers, &sessions, &request("ZZZZ-0000"))
            .unwrap();
        assert_eq!(
            decision,
            AccessDecision::reject(RejectReason::InvalidCredential)
        );
    }

    #[test]
    fn second_redemption_rejected() {
        let (gate, plans, vouchers, sessions, plan) = setup();
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();

        gate.authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        let second = gate
            .authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        assert_eq!(second, AccessDecision::reject(RejectReason::UsedOrExpired));
        assert_eq!(sessions.active_count(), 1);
    }

    #[test]
    fn lapsed_voucher_rejected_and_retired() {
        let (gate, plans, vouchers, sessions, plan) = setup();
        let mut voucher = Voucher::dummy("AB12-CD34", plan.id);
        voucher.expires_at = Utc::now() - chrono::Duration::minutes(1);
        vouchers.insert(voucher).unwrap();

        let decision = gate
            .authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        assert_eq!(decision, AccessDecision::reject(RejectReason::Expired));

        // The rejection persisted the retirement.
        let stored = vouchers.get(&VoucherCode::new("AB12-CD34")).unwrap().value;
        assert_eq!(stored.status, VoucherStatus::Expired);
    }

    #[test]
    fn exhausted_voucher_rejected_when_enforced() {
        let (gate, plans, vouchers, sessions, plan) = setup();
        let mut voucher = Voucher::dummy("AB12-CD34", plan.id);
        voucher.record_usage(plan.data_quota(), Decimal::ZERO);
        vouchers.insert(voucher).unwrap();

        let decision = gate
            .authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        assert_eq!(decision, AccessDecision::reject(RejectReason::QuotaExhausted));
    }

    #[test]
    fn exhausted_voucher_admitted_when_not_enforced() {
        let (_, plans, vouchers, sessions, plan) = setup();
        let gate = AccessGate::new(EngineConfig {
            enforce_quota_at_gate: false,
            ..EngineConfig::default()
        });
        let mut voucher = Voucher::dummy("AB12-CD34", plan.id);
        voucher.record_usage(plan.data_quota(), Decimal::ZERO);
        vouchers.insert(voucher).unwrap();

        let decision = gate
            .authenticate(&plans, &vouchers, &sessions, &request("AB12-CD34"))
            .unwrap();
        assert!(matches!(decision, AccessDecision::Accept { .. }));
    }

    #[test]
    fn concurrent_redemption_single_winner() {
        let (gate, plans, vouchers, sessions, plan) = setup();
        let gate = Arc::new(gate);
        let plans = Arc::new(plans);
        let vouchers = Arc::new(vouchers);
        let sessions = Arc::new(sessions);
        vouchers.insert(Voucher::dummy("AB12-CD34", plan.id)).unwrap();

        let handles: Vec<_> = (0u8..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let plans = Arc::clone(&plans);
                let vouchers = Arc::clone(&vouchers);
                let sessions = Arc::clone(&sessions);
                std::thread::spawn(move || {
                    let req = AccessRequest {
                        code: VoucherCode::new("AB12-CD34"),
                        client: client(i),
                    };
                    gate.authenticate(&plans, &vouchers, &sessions, &req).unwrap()
                })
            })
            .collect();

        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let accepted = decisions
            .iter()
            .filter(|d| matches!(d, AccessDecision::Accept { .. }))
            .count();
        assert_eq!(accepted, 1, "exactly one concurrent redeemer may win");
        for d in &decisions {
            if let AccessDecision::Reject { reason } = d {
                assert_eq!(*reason, RejectReason::UsedOrExpired);
            }
        }
        assert_eq!(sessions.active_count(), 1);
    }
}
