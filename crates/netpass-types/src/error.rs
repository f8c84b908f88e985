//! Error types for the Netpass engine.
//!
//! All errors use the `NP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Voucher errors
//! - 2xx: Plan errors
//! - 3xx: Transaction / payment errors
//! - 4xx: Session / accounting errors
//! - 5xx: Store errors
//! - 9xx: General / internal errors
//!
//! Broad classes cut across the groups: *NotFound* (100, 200, 300),
//! *InvalidState* (101, 102, 106, 402), *Conflict* (103, 401, 500, 501),
//! *UpstreamFailure* (303). Every variant's `Display` output carries the
//! human-readable reason alongside the machine-checkable code.

use thiserror::Error;

use crate::{CorrelationId, PlanId, SessionId, SessionStatus, TransactionId, VoucherCode, VoucherStatus};

/// Central error enum for all Netpass operations.
#[derive(Debug, Error)]
pub enum NetpassError {
    // =================================================================
    // Voucher Errors (1xx)
    // =================================================================
    /// The presented code does not resolve to any voucher.
    #[error("NP_ERR_100: Voucher not found: {0}")]
    VoucherNotFound(VoucherCode),

    /// The voucher exists but is not in the Active state.
    #[error("NP_ERR_101: Voucher {code} is {status}, not ACTIVE")]
    VoucherNotActive {
        code: VoucherCode,
        status: VoucherStatus,
    },

    /// The voucher's redemption deadline has passed.
    #[error("NP_ERR_102: Voucher expired: {0}")]
    VoucherExpired(VoucherCode),

    /// A voucher with this code already exists (issuance retries on this).
    #[error("NP_ERR_103: Duplicate voucher code: {0}")]
    DuplicateCode(VoucherCode),

    /// The generator gave up finding a collision-free code.
    #[error("NP_ERR_104: Code space exhausted after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },

    /// Client identifiers are bound once, at first redemption.
    #[error("NP_ERR_105: Voucher {0} already has bound client identifiers")]
    ClientAlreadyBound(VoucherCode),

    /// A voucher state transition that the lifecycle forbids.
    #[error("NP_ERR_106: Invalid voucher transition: {from} -> {to}")]
    InvalidVoucherTransition {
        from: VoucherStatus,
        to: VoucherStatus,
    },

    // =================================================================
    // Plan Errors (2xx)
    // =================================================================
    /// Dangling plan reference — a data-integrity fault, never retried.
    #[error("NP_ERR_200: Plan not found: {0}")]
    PlanNotFound(PlanId),

    // =================================================================
    // Transaction / Payment Errors (3xx)
    // =================================================================
    /// The transaction id does not resolve.
    #[error("NP_ERR_300: Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// No transaction carries this provider correlation id.
    #[error("NP_ERR_301: No transaction for correlation id: {0}")]
    CorrelationNotFound(CorrelationId),

    /// The provider callback envelope was missing required metadata.
    #[error("NP_ERR_302: Malformed payment notification: {reason}")]
    MalformedNotification { reason: String },

    /// Payment provider transport failure. The transaction stays Pending;
    /// a later webhook still reconciles correctly.
    #[error("NP_ERR_303: Upstream payment provider failure: {reason}")]
    UpstreamFailure { reason: String },

    // =================================================================
    // Session / Accounting Errors (4xx)
    // =================================================================
    /// The session id does not resolve.
    #[error("NP_ERR_400: Session not found: {0}")]
    SessionNotFound(SessionId),

    /// A voucher may have at most one Active session at a time.
    #[error("NP_ERR_401: Voucher {0} already has an active session")]
    ActiveSessionExists(VoucherCode),

    /// A session state transition that the lifecycle forbids.
    #[error("NP_ERR_402: Invalid session transition: {from} -> {to}")]
    InvalidSessionTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    // =================================================================
    // Store Errors (5xx)
    // =================================================================
    /// Optimistic concurrency failure — the record changed under us.
    /// Callers re-read and answer from the post-race state.
    #[error("NP_ERR_500: Version conflict on key: {key}")]
    VersionConflict { key: String },

    /// Insert would overwrite an existing record.
    #[error("NP_ERR_501: Duplicate key: {key}")]
    DuplicateKey { key: String },

    /// Compare-and-swap against a key that no longer exists.
    #[error("NP_ERR_502: Key missing from store: {key}")]
    KeyMissing { key: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("NP_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("NP_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid limits, bad window, etc.).
    #[error("NP_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, NetpassError>;

impl From<serde_json::Error> for NetpassError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = NetpassError::PlanNotFound(PlanId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("NP_ERR_200"), "Got: {msg}");
    }

    #[test]
    fn voucher_not_active_display() {
        let err = NetpassError::VoucherNotActive {
            code: VoucherCode::new("AAAA-BBBB"),
            status: VoucherStatus::Used,
        };
        let msg = format!("{err}");
        assert!(msg.contains("NP_ERR_101"));
        assert!(msg.contains("AAAA-BBBB"));
        assert!(msg.contains("USED"));
    }

    #[test]
    fn all_errors_have_np_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(NetpassError::CodeSpaceExhausted { attempts: 32 }),
            Box::new(NetpassError::ActiveSessionExists(VoucherCode::new("AAAA-BBBB"))),
            Box::new(NetpassError::VersionConflict { key: "k".into() }),
            Box::new(NetpassError::UpstreamFailure { reason: "timeout".into() }),
            Box::new(NetpassError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("NP_ERR_"), "Error missing NP_ERR_ prefix: {msg}");
        }
    }
}
