//! # Voucher — the single-use access credential
//!
//! A `Voucher` is minted by payment reconciliation (payer-bound) or bulk
//! issuance (unbound) and consumed exactly once at the access gate.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  first redemption   ┌──────┐
//!   │ ACTIVE ├────────────────────▶│ USED │
//!   └───┬────┘                     └──────┘
//!       │ deadline passes
//!       ▼
//!   ┌─────────┐
//!   │ EXPIRED │
//!   └─────────┘
//! ```
//!
//! Used and Expired are terminal. Client identifiers are bound once, at
//! first redemption, and never reassigned. Expiry is a property of the
//! clock, not of stored status: an Active voucher past `expires_at` must
//! be treated as expired wherever status is read.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClientId, MacAddress, NetpassError, PayerId, Plan, PlanId, Result, TransactionId, VoucherCode};

/// The lifecycle state of a voucher.
///
/// Transitions are monotonic:
/// - `Active → Used` (first successful redemption)
/// - `Active → Expired` (redemption deadline passed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherStatus {
    /// Issued and redeemable. The only state the gate accepts.
    Active,
    /// Consumed by a redemption. **Irreversible.** This is what makes the
    /// credential single-use.
    Used,
    /// The redemption window closed before the voucher was used.
    Expired,
}

impl VoucherStatus {
    /// Can this voucher transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Active, Self::Used | Self::Expired))
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Used => write!(f, "USED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// The credential itself: a unique code bound to a plan and a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Globally unique code, the store key.
    pub code: VoucherCode,
    /// The plan whose quotas this voucher grants.
    pub plan: PlanId,
    /// The paying customer, when payment-bound. Bulk vouchers are unbound.
    pub payer: Option<PayerId>,
    /// The transaction that minted this voucher, when payment-bound.
    pub transaction: Option<TransactionId>,
    /// Current lifecycle state.
    pub status: VoucherStatus,
    /// Cumulative data consumed, in plan units (MB). Mirrored from the
    /// session by the accountant; last report wins.
    pub data_used_mb: Decimal,
    /// Cumulative time consumed, in plan units (minutes).
    pub time_used_min: Decimal,
    /// Stamped at first redemption.
    pub session_start: Option<DateTime<Utc>>,
    /// Stamped when the session terminates.
    pub session_end: Option<DateTime<Utc>>,
    /// Link-layer address bound at first redemption.
    pub mac_address: Option<MacAddress>,
    /// Network address bound at first redemption.
    pub ip_address: Option<IpAddr>,
    /// Absolute redemption deadline.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// When the voucher was consumed.
    pub used_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// A fresh Active voucher. Issuance owns uniqueness of `code`.
    #[must_use]
    pub fn new(code: VoucherCode, plan: PlanId, expires_at: DateTime<Utc>) -> Self {
        Self {
            code,
            plan,
            payer: None,
            transaction: None,
            status: VoucherStatus::Active,
            data_used_mb: Decimal::ZERO,
            time_used_min: Decimal::ZERO,
            session_start: None,
            session_end: None,
            mac_address: None,
            ip_address: None,
            expires_at,
            created_at: Utc::now(),
            used_at: None,
        }
    }

    /// Bind the payer and originating transaction (single issuance path).
    #[must_use]
    pub fn bound_to(mut self, payer: PayerId, transaction: TransactionId) -> Self {
        self.payer = Some(payer);
        self.transaction = Some(transaction);
        self
    }

    /// Whether the redemption deadline has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether reported usage has met or exceeded the plan's quota.
    #[must_use]
    pub fn is_exhausted(&self, plan: &Plan) -> bool {
        self.data_used_mb >= plan.data_quota() || self.time_used_min >= plan.time_quota()
    }

    /// Consume the voucher at first redemption.
    ///
    /// # Errors
    /// Returns `InvalidVoucherTransition` unless the voucher is Active.
    pub fn mark_used(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(VoucherStatus::Used) {
            return Err(NetpassError::InvalidVoucherTransition {
                from: self.status,
                to: VoucherStatus::Used,
            });
        }
        self.status = VoucherStatus::Used;
        self.used_at = Some(at);
        self.session_start = Some(at);
        Ok(())
    }

    /// Retire the voucher because its deadline passed.
    ///
    /// # Errors
    /// Returns `InvalidVoucherTransition` unless the voucher is Active.
    pub fn mark_expired(&mut self) -> Result<()> {
        if !self.status.can_transition_to(VoucherStatus::Expired) {
            return Err(NetpassError::InvalidVoucherTransition {
                from: self.status,
                to: VoucherStatus::Expired,
            });
        }
        self.status = VoucherStatus::Expired;
        Ok(())
    }

    /// Bind the redeeming client's identifiers. Set once, never reassigned.
    ///
    /// # Errors
    /// Returns `ClientAlreadyBound` if identifiers were bound before.
    pub fn bind_client(&mut self, client: &ClientId) -> Result<()> {
        if self.mac_address.is_some() || self.ip_address.is_some() {
            return Err(NetpassError::ClientAlreadyBound(self.code.clone()));
        }
        self.mac_address = Some(client.mac_address.clone());
        self.ip_address = Some(client.ip_address);
        Ok(())
    }

    /// Overwrite cumulative usage with the latest reported values.
    pub fn record_usage(&mut self, data_used_mb: Decimal, time_used_min: Decimal) {
        self.data_used_mb = data_used_mb;
        self.time_used_min = time_used_min;
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Voucher {
    /// An unbound Active voucher valid for 24 hours.
    #[must_use]
    pub fn dummy(code: &str, plan: PlanId) -> Self {
        Self::new(
            VoucherCode::new(code),
            plan,
            Utc::now() + chrono::Duration::hours(24),
        )
    }
}
