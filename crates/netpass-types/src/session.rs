//! Sessions: one live redemption of a voucher.
//!
//! Created by the access gate at first redemption (or by an idempotent
//! Start report), mutated only by the session accountant, and never
//! physically deleted — terminated sessions remain as the audit log.
//!
//! At most one session per voucher is Active at any time; the session
//! store enforces that invariant on insert.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClientId, MacAddress, NetpassError, PayerId, Result, SessionId, VoucherCode};

/// The lifecycle state of a session.
///
/// `Active → Terminated` on a Stop report or detected quota exhaustion;
/// `Active → Expired` when the parent voucher's deadline lapses mid-session.
/// Both end states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Expired,
    Terminated,
}

impl SessionStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Expired | Self::Terminated)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// One redemption instance of a voucher, tracking cumulative usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// The voucher this session redeems, by code.
    pub voucher: VoucherCode,
    pub payer: Option<PayerId>,
    pub mac_address: MacAddress,
    pub ip_address: IpAddr,
    /// Cumulative data consumed, in plan units (MB). Last report wins.
    pub data_used_mb: Decimal,
    /// Cumulative time consumed, in plan units (minutes).
    pub time_used_min: Decimal,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// A fresh Active session for the given voucher and client.
    #[must_use]
    pub fn new(voucher: VoucherCode, payer: Option<PayerId>, client: &ClientId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            voucher,
            payer,
            mac_address: client.mac_address.clone(),
            ip_address: client.ip_address,
            data_used_mb: Decimal::ZERO,
            time_used_min: Decimal::ZERO,
            status: SessionStatus::Active,
            start_time: now,
            end_time: None,
            last_activity: now,
        }
    }

    /// Overwrite cumulative usage with the latest reported values and
    /// refresh the activity timestamp. Reports are cumulative, so this is
    /// last-write-wins — never additive.
    pub fn record_usage(&mut self, data_used_mb: Decimal, time_used_min: Decimal, at: DateTime<Utc>) {
        self.data_used_mb = data_used_mb;
        self.time_used_min = time_used_min;
        self.last_activity = at;
    }

    /// Finalize the session on a Stop report or quota exhaustion.
    ///
    /// # Errors
    /// Returns `InvalidSessionTransition` unless the session is Active.
    pub fn terminate(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(SessionStatus::Terminated) {
            return Err(NetpassError::InvalidSessionTransition {
                from: self.status,
                to: SessionStatus::Terminated,
            });
        }
        self.status = SessionStatus::Terminated;
        self.end_time = Some(at);
        self.last_activity = at;
        Ok(())
    }
}
