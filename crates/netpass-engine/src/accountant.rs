//! The session accountant: usage ingestion from the gateway.
//!
//! The gateway reports cumulative usage with at-least-once delivery and no
//! ordering guarantee, so every path here is a tolerant no-op when the
//! world already looks the way the report says it should: a Start for a
//! voucher with a live session confirms it, an Update or Stop with no live
//! session is dropped, and usage writes are last-write-wins overwrites.
//!
//! Quota exhaustion is detected here, on the hot path: a report that takes
//! usage to or past the plan quota terminates the session the same way a
//! Stop would.

use chrono::Utc;
use netpass_store::{PlanCatalog, SessionStore, VoucherStore};
use netpass_types::{
    AccountingAck, NetpassError, ReportKind, Result, Session, UsageReport,
    VoucherStatus,
};

/// What a report actually did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A Start report opened this voucher's session.
    SessionOpened,
    /// A Start report found the session already open.
    StartConfirmed,
    /// Usage recorded; the session stays live.
    UsageRecorded,
    /// The session was finalized by a Stop report.
    SessionStopped,
    /// The session was finalized because usage met the plan quota.
    QuotaExhausted,
    /// Nothing to apply: no live session for the voucher.
    NoLiveSession,
}

/// Applies gateway usage reports to sessions and their vouchers.
#[derive(Debug, Default)]
pub struct SessionAccountant;

impl SessionAccountant {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Ingest one report and acknowledge it.
    ///
    /// The gateway drops the session on a failed ack, so only reports we
    /// genuinely could not attribute come back `Failed`; internal faults
    /// are logged and the report is still acknowledged where possible.
    pub fn ingest(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        sessions: &SessionStore,
        report: &UsageReport,
    ) -> AccountingAck {
        match self.apply(plans, vouchers, sessions, report) {
            Ok(outcome) => {
                tracing::debug!(
                    code = %report.code,
                    kind = %report.kind,
                    ?outcome,
                    "usage report applied"
                );
                AccountingAck::Success
            }
            Err(err) => {
                tracing::warn!(code = %report.code, kind = %report.kind, %err, "usage report refused");
                AccountingAck::Failed
            }
        }
    }

    /// The ingestion algorithm itself, with the real error surface.
    pub fn apply(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        sessions: &SessionStore,
        report: &UsageReport,
    ) -> Result<IngestOutcome> {
        if vouchers.get(&report.code).is_none() {
            return Err(NetpassError::VoucherNotFound(report.code.clone()));
        }

        match report.kind {
            ReportKind::Start => self.apply_start(vouchers, sessions, report),
            ReportKind::Update | ReportKind::Stop => {
                self.apply_usage(plans, vouchers, sessions, report)
            }
        }
    }

    /// Start: open the session if the gate has not already, else confirm.
    fn apply_start(
        &self,
        vouchers: &VoucherStore,
        sessions: &SessionStore,
        report: &UsageReport,
    ) -> Result<IngestOutcome> {
        if sessions.active_for_voucher(&report.code).is_some() {
            return Ok(IngestOutcome::StartConfirmed);
        }

        let payer = vouchers.get(&report.code).and_then(|rec| rec.value.payer);
        let session = Session::new(report.code.clone(), payer, &report.client);
        match sessions.insert(session) {
            Ok(()) => {
                self.stamp_session_start(vouchers, report)?;
                Ok(IngestOutcome::SessionOpened)
            }
            // A racing Start or gate acceptance got there first.
            Err(NetpassError::ActiveSessionExists(_)) => Ok(IngestOutcome::StartConfirmed),
            Err(err) => Err(err),
        }
    }

    /// Update/Stop: overwrite cumulative usage, finalize on Stop or when
    /// the plan quota is met.
    fn apply_usage(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        sessions: &SessionStore,
        report: &UsageReport,
    ) -> Result<IngestOutcome> {
        let data_used_mb = report.data_used_mb();
        let time_used_min = report.time_used_min();
        let stop = report.kind == ReportKind::Stop;

        let Some(mut current) = sessions.active_for_voucher(&report.code) else {
            // Stop after Stop, or an Update that outlived its session.
            tracing::debug!(code = %report.code, kind = %report.kind, "no live session; dropped");
            return Ok(IngestOutcome::NoLiveSession);
        };

        let voucher = vouchers
            .get(&report.code)
            .ok_or_else(|| NetpassError::VoucherNotFound(report.code.clone()))?
            .value;
        let plan = plans.get(voucher.plan)?;
        let exhausted =
            data_used_mb >= plan.data_quota() || time_used_min >= plan.time_quota();
        let finalize = stop || exhausted;

        loop {
            let now = Utc::now();
            let mut session = current.value.clone();
            session.record_usage(data_used_mb, time_used_min, now);
            if finalize {
                session.terminate(now)?;
            }
            let session_id = session.id;
            match sessions.compare_and_swap(&session_id, current.version, session) {
                Ok(_) => break,
                Err(NetpassError::VersionConflict { .. }) => {
                    match sessions.active_for_voucher(&report.code) {
                        Some(rec) => current = rec,
                        // A racing report already finalized it.
                        None => return Ok(IngestOutcome::NoLiveSession),
                    }
                }
                Err(NetpassError::KeyMissing { .. }) => return Ok(IngestOutcome::NoLiveSession),
                Err(err) => return Err(err),
            }
        }

        self.mirror_usage(vouchers, report, data_used_mb, time_used_min, finalize)?;

        if exhausted && !stop {
            tracing::info!(code = %report.code, "session terminated: plan quota exhausted");
            return Ok(IngestOutcome::QuotaExhausted);
        }
        if stop {
            return Ok(IngestOutcome::SessionStopped);
        }
        Ok(IngestOutcome::UsageRecorded)
    }

    /// Mirror session usage onto the voucher so the status query and the
    /// gate's quota check see it without a session join.
    fn mirror_usage(
        &self,
        vouchers: &VoucherStore,
        report: &UsageReport,
        data_used_mb: rust_decimal::Decimal,
        time_used_min: rust_decimal::Decimal,
        finalize: bool,
    ) -> Result<()> {
        loop {
            let Some(record) = vouchers.get(&report.code) else {
                return Err(NetpassError::VoucherNotFound(report.code.clone()));
            };
            let mut voucher = record.value;
            voucher.record_usage(data_used_mb, time_used_min);
            if finalize {
                voucher.session_end = Some(Utc::now());
                if voucher.status == VoucherStatus::Active {
                    // Session consumed a voucher the gate never flipped
                    // (gateway-side credential caching); retire it now.
                    voucher.mark_used(Utc::now())?;
                }
            }
            match vouchers.compare_and_swap(&report.code, record.version, voucher) {
                Ok(_) => return Ok(()),
                Err(NetpassError::VersionConflict { .. }) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Align the voucher's session_start with an accountant-opened session.
    fn stamp_session_start(&self, vouchers: &VoucherStore, report: &UsageReport) -> Result<()> {
        loop {
            let Some(record) = vouchers.get(&report.code) else {
                return Err(NetpassError::VoucherNotFound(report.code.clone()));
            };
            let mut voucher = record.value;
            if voucher.session_start.is_some() {
                return Ok(());
            }
            voucher.session_start = Some(Utc::now());
            match vouchers.compare_and_swap(&report.code, record.version, voucher) {
                Ok(_) => return Ok(()),
                Err(NetpassError::VersionConflict { .. }) => {}
                Err(err) => return Err(err),
            }
        }
    }
}
