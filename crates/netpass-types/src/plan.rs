//! Catalog plans: price and quota definitions.
//!
//! Plans are owned by the admin collaborator and immutable after creation.
//! The engine only ever reads them to resolve quotas and gateway limits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, PlanId};

/// A catalog entry defining price, data quota, and time quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    /// Data quota in megabytes.
    pub data_limit_mb: u64,
    /// Time quota in minutes.
    pub time_limit_min: u64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal, data_limit_mb: u64, time_limit_min: u64) -> Self {
        Self {
            id: PlanId::new(),
            name: name.into(),
            price,
            currency: constants::DEFAULT_CURRENCY.to_string(),
            data_limit_mb,
            time_limit_min,
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Data quota in the unit the gateway enforces (bytes).
    #[must_use]
    pub fn data_limit_bytes(&self) -> u64 {
        self.data_limit_mb * constants::BYTES_PER_MB
    }

    /// Time quota in the unit the gateway enforces (seconds).
    #[must_use]
    pub fn time_limit_secs(&self) -> u64 {
        self.time_limit_min * constants::SECS_PER_MIN
    }

    /// Data quota expressed in plan units for usage comparisons.
    #[must_use]
    pub fn data_quota(&self) -> Decimal {
        Decimal::from(self.data_limit_mb)
    }

    /// Time quota expressed in plan units for usage comparisons.
    #[must_use]
    pub fn time_quota(&self) -> Decimal {
        Decimal::from(self.time_limit_min)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Plan {
    /// A 1024 MB / 240 min plan priced at 200, mirroring the "Standard"
    /// catalog entry used across the scenario tests.
    #[must_use]
    pub fn dummy_standard() -> Self {
        Self::new("Standard", Decimal::new(200, 0), 1024, 240)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_unit_conversion() {
        let plan = Plan::dummy_standard();
        assert_eq!(plan.data_limit_bytes(), 1024 * 1024 * 1024);
        assert_eq!(plan.time_limit_secs(), 240 * 60);
    }

    #[test]
    fn new_plan_is_active() {
        let plan = Plan::new("Lite", Decimal::new(50, 0), 100, 60);
        assert!(plan.is_active);
        assert_eq!(plan.currency, "KES");
    }

    #[test]
    fn plan_serde_roundtrip() {
        let plan = Plan::dummy_standard();
        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan.id, back.id);
        assert_eq!(plan.price, back.price);
        assert_eq!(plan.data_limit_mb, back.data_limit_mb);
    }
}
