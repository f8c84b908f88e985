//! Identifiers used throughout Netpass.
//!
//! Entity ids use UUIDv7 for time-ordered lexicographic sorting. The two
//! externally supplied identifiers keep their wire shape: [`VoucherCode`]
//! (the human-typable credential) and [`CorrelationId`] (the provider's
//! payment-request echo).

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;

// ---------------------------------------------------------------------------
// PlanId
// ---------------------------------------------------------------------------

/// Unique identifier for a catalog plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PlanId(pub Uuid);

impl PlanId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Unique identifier for a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque identifier for one redemption session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sess:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PayerId
// ---------------------------------------------------------------------------

/// Unique identifier for a paying customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PayerId(pub Uuid);

impl PayerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payer:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// VoucherCode
// ---------------------------------------------------------------------------

/// The human-typable credential: 8 alphanumeric symbols rendered `XXXX-XXXX`.
///
/// Codes are globally unique across all time, not just among active
/// vouchers — the [`crate::Voucher`] store is keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Wrap a presented code. Trims surrounding whitespace and uppercases,
    /// so gateway input matches issued codes byte-for-byte.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the code matches the issued shape: two 4-symbol groups from
    /// the 36-symbol alphabet joined by a dash.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let bytes = self.0.as_bytes();
        if bytes.len() != constants::CODE_LENGTH + 1 {
            return false;
        }
        self.0.char_indices().all(|(i, c)| {
            if i == constants::CODE_GROUP_LENGTH {
                c == '-'
            } else {
                constants::CODE_ALPHABET.contains(c)
            }
        })
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Provider-issued identifier linking a webhook notification back to the
/// transaction that initiated the payment request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corr:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MacAddress
// ---------------------------------------------------------------------------

/// Link-layer address of a connecting client, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    #[must_use]
    pub fn new(mac: impl Into<String>) -> Self {
        Self(mac.into().trim().to_ascii_uppercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client identifiers presented at the gate and on every accounting report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientId {
    pub mac_address: MacAddress,
    pub ip_address: IpAddr,
}

impl ClientId {
    #[must_use]
    pub fn new(mac: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            mac_address: MacAddress::new(mac),
            ip_address: ip,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
