//! Voucher issuance: single (payment-bound) and bulk (pre-paid).
//!
//! Single issuance runs inside payment reconciliation: a completed
//! transaction mints exactly one voucher bound to its payer, valid for
//! the redemption window (default 24 hours).
//!
//! Bulk issuance mints unbound vouchers sharing one expiry horizon. It is
//! deliberately best-effort: vouchers persisted before a mid-batch
//! failure are not rolled back, and the caller re-queries the store to
//! see what was actually created.

use chrono::{Duration, Utc};
use netpass_store::{PlanCatalog, VoucherStore};
use netpass_types::{EngineConfig, NetpassError, PlanId, Result, Transaction, Voucher};

use crate::codegen::CodeGenerator;

/// Mints vouchers against the catalog and the voucher store.
#[derive(Debug)]
pub struct VoucherIssuer {
    config: EngineConfig,
}

impl VoucherIssuer {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Mint the single voucher for a completed transaction.
    ///
    /// # Errors
    /// - `PlanNotFound` if the transaction's plan reference dangles — a
    ///   data-integrity fault, not retried
    /// - `CodeSpaceExhausted` if no collision-free code could be found
    pub fn issue_for_transaction(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        transaction: &Transaction,
    ) -> Result<Voucher> {
        let plan = plans.get(transaction.plan)?;
        let expires_at = Utc::now() + Duration::hours(self.config.redemption_window_hours);

        let voucher = self.mint(vouchers, |code| {
            Voucher::new(code, plan.id, expires_at).bound_to(transaction.payer, transaction.id)
        })?;

        tracing::info!(
            code = %voucher.code,
            transaction = %transaction.id,
            plan = %plan.name,
            "voucher issued for completed payment"
        );
        Ok(voucher)
    }

    /// Mint `quantity` unbound vouchers sharing one expiry horizon.
    ///
    /// Partial batches are not rolled back: a failure at item N leaves
    /// items 0..N persisted.
    ///
    /// # Errors
    /// - `PlanNotFound` if the plan id does not resolve
    /// - `CodeSpaceExhausted` if a collision-free code could not be found
    pub fn issue_bulk(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        plan_id: PlanId,
        quantity: usize,
        expiry_days: i64,
    ) -> Result<Vec<Voucher>> {
        let plan = plans.get(plan_id)?;
        let expires_at = Utc::now() + Duration::days(expiry_days);

        let mut batch = Vec::with_capacity(quantity);
        for _ in 0..quantity {
            let voucher = self.mint(vouchers, |code| Voucher::new(code, plan.id, expires_at))?;
            batch.push(voucher);
        }

        tracing::info!(
            plan = %plan.name,
            quantity = batch.len(),
            expiry_days,
            "bulk vouchers issued"
        );
        Ok(batch)
    }

    /// Generate a unique code and persist the voucher built from it.
    ///
    /// The generator's probe and the insert are separate steps, so a
    /// concurrent issuance can still take the code in between; the
    /// store's duplicate rejection turns that into another attempt.
    fn mint<F>(&self, vouchers: &VoucherStore, build: F) -> Result<Voucher>
    where
        F: Fn(netpass_types::VoucherCode) -> Voucher,
    {
        for _ in 0..self.config.max_code_attempts {
            let code = CodeGenerator::generate(vouchers, self.config.max_code_attempts)?;
            let voucher = build(code);
            match vouchers.insert(voucher.clone()) {
                Ok(()) => return Ok(voucher),
                Err(NetpassError::DuplicateCode(code)) => {
                    tracing::debug!(%code, "code taken between probe and insert, retrying");
                }
                Err(err) => return Err(err),
            }
        }
        Err(NetpassError::CodeSpaceExhausted {
            attempts: self.config.max_code_attempts,
        })
    }
}
