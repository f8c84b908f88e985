//! Configuration for the Netpass engine.

use serde::{Deserialize, Serialize};

use crate::{constants, NetpassError, Result};

/// Tunables for issuance, expiry, and gate policy.
///
/// When `enforce_quota_at_gate` is set (the default), the gate rejects a
/// voucher whose mirrored usage counters already meet plan quota, rather
/// than gating on status alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Redemption window for payment-bound vouchers, in hours.
    pub redemption_window_hours: i64,
    /// Default expiry horizon for bulk-issued vouchers, in days.
    pub bulk_expiry_days: i64,
    /// Generate-and-check attempts before issuance gives up.
    pub max_code_attempts: usize,
    /// Reject exhausted vouchers at the gate independent of status.
    pub enforce_quota_at_gate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redemption_window_hours: constants::DEFAULT_REDEMPTION_WINDOW_HOURS,
            bulk_expiry_days: constants::DEFAULT_BULK_EXPIRY_DAYS,
            max_code_attempts: constants::MAX_CODE_ATTEMPTS,
            enforce_quota_at_gate: true,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration before the engine starts.
    pub fn validate(&self) -> Result<()> {
        if self.redemption_window_hours <= 0 {
            return Err(NetpassError::Configuration(
                "redemption_window_hours must be positive".to_string(),
            ));
        }
        if self.bulk_expiry_days <= 0 {
            return Err(NetpassError::Configuration(
                "bulk_expiry_days must be positive".to_string(),
            ));
        }
        if self.max_code_attempts == 0 {
            return Err(NetpassError::Configuration(
                "max_code_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.redemption_window_hours, 24);
        assert_eq!(cfg.bulk_expiry_days, 30);
        assert!(cfg.enforce_quota_at_gate);
    }

    #[test]
    fn zero_window_rejected() {
        let cfg = EngineConfig {
            redemption_window_hours: 0,
            ..EngineConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, NetpassError::Configuration(_)));
    }

    #[test]
    fn zero_attempts_rejected() {
        let cfg = EngineConfig {
            max_code_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.redemption_window_hours, back.redemption_window_hours);
        assert_eq!(cfg.enforce_quota_at_gate, back.enforce_quota_at_gate);
    }
}
