//! Read-mostly plan catalog.
//!
//! Plans are seeded by the admin collaborator and never mutated by the
//! engine, so there is no versioning here — just an insert-once map with
//! resolving lookups that turn dangling references into `PlanNotFound`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use netpass_types::{NetpassError, Plan, PlanId, Result};

/// The catalog of purchasable plans.
#[derive(Debug)]
pub struct PlanCatalog {
    plans: RwLock<HashMap<PlanId, Plan>>,
}

impl PlanCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plan. Plans are immutable after creation.
    ///
    /// # Errors
    /// Returns `DuplicateKey` if the plan id is already registered.
    pub fn insert(&self, plan: Plan) -> Result<()> {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        if plans.contains_key(&plan.id) {
            return Err(NetpassError::DuplicateKey {
                key: plan.id.to_string(),
            });
        }
        plans.insert(plan.id, plan);
        Ok(())
    }

    /// Resolve a plan reference.
    ///
    /// # Errors
    /// Returns `PlanNotFound` for a dangling reference — callers treat
    /// this as a data-integrity fault, never a retry.
    pub fn get(&self, id: PlanId) -> Result<Plan> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(NetpassError::PlanNotFound(id))
    }

    /// All plans currently offered for sale.
    #[must_use]
    pub fn active(&self) -> Vec<Plan> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|plan| plan.is_active)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}
