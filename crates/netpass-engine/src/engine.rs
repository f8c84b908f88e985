//! The engine facade: stores and components bundled behind one handle.
//!
//! Hosts (an HTTP webhook endpoint, a RADIUS frontend, a scheduler)
//! construct one `NetpassEngine` and call into it concurrently; every
//! method takes `&self` and all mutation goes through the stores'
//! compare-and-set, so the facade needs no locking of its own.

use chrono::Utc;
use netpass_store::{PlanCatalog, SessionStore, TransactionStore, VoucherStore};
use netpass_types::{
    AccountingAck, CorrelationId, EngineConfig, NotificationAck, PayerId, Plan, PlanId,
    ProviderCallback, Result, Transaction, UsageReport, Voucher, VoucherCode,
};

use crate::accountant::SessionAccountant;
use crate::gate::{AccessDecision, AccessGate, AccessRequest};
use crate::issuance::VoucherIssuer;
use crate::reconciler::PaymentReconciler;
use crate::status::StatusSnapshot;
use crate::sweeper;

/// The voucher lifecycle engine.
#[derive(Debug)]
pub struct NetpassEngine {
    config: EngineConfig,
    plans: PlanCatalog,
    vouchers: VoucherStore,
    transactions: TransactionStore,
    sessions: SessionStore,
    issuer: VoucherIssuer,
    reconciler: PaymentReconciler,
    gate: AccessGate,
    accountant: SessionAccountant,
}

impl NetpassEngine {
    /// Build an engine with empty stores.
    ///
    /// # Errors
    /// Returns `Configuration` if the config fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            plans: PlanCatalog::new(),
            vouchers: VoucherStore::new(),
            transactions: TransactionStore::new(),
            sessions: SessionStore::new(),
            issuer: VoucherIssuer::new(config.clone()),
            reconciler: PaymentReconciler::new(VoucherIssuer::new(config.clone())),
            gate: AccessGate::new(config.clone()),
            accountant: SessionAccountant::new(),
            config,
        })
    }

    /// Register a plan in the catalog.
    ///
    /// # Errors
    /// Returns `DuplicateKey` if the plan id is already registered.
    pub fn register_plan(&self, plan: Plan) -> Result<()> {
        self.plans.insert(plan)
    }

    /// Plans currently offered for purchase.
    #[must_use]
    pub fn active_plans(&self) -> Vec<Plan> {
        self.plans.active()
    }

    /// Open a Pending transaction for a payer buying a plan, priced from
    /// the catalog, carrying the provider's correlation id for the webhook
    /// to resolve later.
    ///
    /// # Errors
    /// - `PlanNotFound` if the plan id does not resolve
    /// - `DuplicateKey` if the correlation id is already in use
    pub fn begin_payment(
        &self,
        payer: PayerId,
        plan_id: PlanId,
        correlation_id: CorrelationId,
    ) -> Result<Transaction> {
        let plan = self.plans.get(plan_id)?;
        let transaction =
            Transaction::new(payer, plan.id, plan.price).with_correlation(correlation_id);
        self.transactions.insert(transaction.clone())?;
        tracing::info!(
            transaction = %transaction.id,
            plan = %plan.name,
            amount = %transaction.amount,
            "payment initiated"
        );
        Ok(transaction)
    }

    /// Handle a raw provider webhook. Malformed envelopes are logged and
    /// acknowledged like every other delivery.
    pub fn handle_provider_callback(&self, callback: ProviderCallback) -> NotificationAck {
        match callback.into_notification() {
            Ok(notification) => self.reconciler.handle(
                &self.plans,
                &self.vouchers,
                &self.transactions,
                &notification,
            ),
            Err(err) => {
                tracing::warn!(%err, "malformed provider callback; acknowledging anyway");
                NotificationAck::success()
            }
        }
    }

    /// Mint a batch of unbound vouchers using the configured expiry horizon.
    ///
    /// # Errors
    /// See [`VoucherIssuer::issue_bulk`]; partial batches are not rolled back.
    pub fn issue_bulk(&self, plan_id: PlanId, quantity: usize) -> Result<Vec<Voucher>> {
        self.issuer.issue_bulk(
            &self.plans,
            &self.vouchers,
            plan_id,
            quantity,
            self.config.bulk_expiry_days,
        )
    }

    /// Decide a redemption attempt at the network edge.
    ///
    /// # Errors
    /// Only on data-integrity faults; ordinary refusals are `Reject` decisions.
    pub fn authenticate(&self, request: &AccessRequest) -> Result<AccessDecision> {
        self.gate
            .authenticate(&self.plans, &self.vouchers, &self.sessions, request)
    }

    /// Ingest one gateway usage report.
    pub fn ingest_report(&self, report: &UsageReport) -> AccountingAck {
        self.accountant
            .ingest(&self.plans, &self.vouchers, &self.sessions, report)
    }

    /// Snapshot a voucher's effective state.
    ///
    /// # Errors
    /// `VoucherNotFound` / `PlanNotFound` per [`crate::status::snapshot`].
    pub fn voucher_status(&self, code: &VoucherCode) -> Result<StatusSnapshot> {
        crate::status::snapshot(&self.plans, &self.vouchers, &self.sessions, code, Utc::now())
    }

    /// Retire stored-Active vouchers whose deadline has passed.
    pub fn sweep_expired(&self) -> usize {
        sweeper::sweep_expired(&self.vouchers, Utc::now())
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct store access for hosts that report or back up state.
    #[must_use]
    pub fn vouchers(&self) -> &VoucherStore {
        &self.vouchers
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_rejected() {
        let err = NetpassEngine::new(EngineConfig {
            bulk_expiry_days: 0,
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, netpass_types::NetpassError::Configuration(_)));
    }

    #[test]
    fn begin_payment_prices_from_catalog() {
        let engine = NetpassEngine::new(EngineConfig::default()).unwrap();
        let plan = Plan::dummy_standard();
        let plan_id = plan.id;
        let price = plan.price;
        engine.register_plan(plan).unwrap();

        let txn = engine
            .begin_payment(PayerId::new(), plan_id, CorrelationId::new("ws_CO_1"))
            .unwrap();
        assert_eq!(txn.amount, price);
        assert!(engine
            .transactions()
            .get_by_correlation(&CorrelationId::new("ws_CO_1"))
            .is_some());
    }

    #[test]
    fn duplicate_correlation_refused_at_initiation() {
        let engine = NetpassEngine::new(EngineConfig::default()).unwrap();
        let plan = Plan::dummy_standard();
        let plan_id = plan.id;
        engine.register_plan(plan).unwrap();

        engine
            .begin_payment(PayerId::new(), plan_id, CorrelationId::new("ws_CO_1"))
            .unwrap();
        let err = engine
            .begin_payment(PayerId::new(), plan_id, CorrelationId::new("ws_CO_1"))
            .unwrap_err();
        assert!(matches!(err, netpass_types::NetpassError::DuplicateKey { .. }));
    }
}
