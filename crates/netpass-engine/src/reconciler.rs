//! Payment reconciliation — maps terminal provider notifications onto
//! transactions, exactly once.
//!
//! The provider delivers webhooks at-least-once, so everything here is
//! idempotency-first: completion is a compare-and-set keyed by the
//! transaction version, and only the writer that flips Pending to
//! Completed mints the voucher. Duplicate and racing deliveries observe
//! Completed and do nothing.
//!
//! The caller-facing [`PaymentReconciler::handle`] always returns a
//! success acknowledgment, even for orphans and internal failures —
//! anything else would put the provider into a retry storm.

use chrono::Utc;
use netpass_store::{PlanCatalog, TransactionStore, VoucherStore};
use netpass_types::{
    NetpassError, NotificationAck, PaymentNotification, PaymentResult, Result, Transaction,
    VoucherCode,
};

use crate::issuance::VoucherIssuer;

/// What a notification actually did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The transaction completed and minted this voucher.
    VoucherMinted(VoucherCode),
    /// Duplicate delivery: the transaction had already completed.
    AlreadyCompleted,
    /// The payment failed and the transaction was marked so.
    MarkedFailed,
    /// Failure notification for a transaction already in a terminal state.
    AlreadyTerminal,
    /// No transaction carries the correlation id; nothing to do.
    Orphaned,
}

/// Converts confirmed payments into vouchers, exactly one per transaction.
#[derive(Debug)]
pub struct PaymentReconciler {
    issuer: VoucherIssuer,
}

impl PaymentReconciler {
    #[must_use]
    pub fn new(issuer: VoucherIssuer) -> Self {
        Self { issuer }
    }

    /// Process a notification and acknowledge it.
    ///
    /// Internal failures are logged and swallowed; the provider always
    /// receives a success envelope.
    pub fn handle(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        transactions: &TransactionStore,
        notification: &PaymentNotification,
    ) -> NotificationAck {
        match self.reconcile(plans, vouchers, transactions, notification) {
            Ok(outcome) => {
                tracing::info!(
                    correlation = %notification.correlation_id,
                    ?outcome,
                    "payment notification reconciled"
                );
            }
            Err(err) => {
                tracing::warn!(
                    correlation = %notification.correlation_id,
                    %err,
                    "payment reconciliation failed; acknowledging anyway"
                );
            }
        }
        NotificationAck::success()
    }

    /// The reconciliation algorithm itself, with the real error surface.
    pub fn reconcile(
        &self,
        plans: &PlanCatalog,
        vouchers: &VoucherStore,
        transactions: &TransactionStore,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome> {
        let Some(mut current) = transactions.get_by_correlation(&notification.correlation_id) else {
            return Ok(ReconcileOutcome::Orphaned);
        };

        match &notification.result {
            PaymentResult::Succeeded { receipt_code, .. } => loop {
                if current.value.status == netpass_types::TransactionStatus::Completed {
                    return Ok(ReconcileOutcome::AlreadyCompleted);
                }

                let mut completed = current.value.clone();
                completed.complete(receipt_code.clone(), Utc::now())?;
                match transactions.compare_and_swap(&completed.id, current.version, completed.clone()) {
                    Ok(_) => {
                        let voucher =
                            self.issuer.issue_for_transaction(plans, vouchers, &completed)?;
                        return Ok(ReconcileOutcome::VoucherMinted(voucher.code));
                    }
                    Err(NetpassError::VersionConflict { .. }) => {
                        current = self.reread(transactions, &completed)?;
                    }
                    Err(err) => return Err(err),
                }
            },
            PaymentResult::Failed { reason } => loop {
                if current.value.status.is_terminal() {
                    return Ok(ReconcileOutcome::AlreadyTerminal);
                }

                let mut failed = current.value.clone();
                failed.fail()?;
                match transactions.compare_and_swap(&failed.id, current.version, failed.clone()) {
                    Ok(_) => {
                        tracing::debug!(
                            transaction = %failed.id,
                            reason = reason.as_deref().unwrap_or("unspecified"),
                            "payment marked failed"
                        );
                        return Ok(ReconcileOutcome::MarkedFailed);
                    }
                    Err(NetpassError::VersionConflict { .. }) => {
                        current = self.reread(transactions, &failed)?;
                    }
                    Err(err) => return Err(err),
                }
            },
        }
    }

    fn reread(
        &self,
        transactions: &TransactionStore,
        transaction: &Transaction,
    ) -> Result<netpass_store::Versioned<Transaction>> {
        transactions
            .get(&transaction.id)
            .ok_or(NetpassError::TransactionNotFound(transaction.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpass_types::{CorrelationId, EngineConfig, Plan, TransactionStatus};
    use rust_decimal::Decimal;

    struct Fixture {
        reconciler: PaymentReconciler,
        plans: PlanCatalog,
        vouchers: VoucherStore,
        transactions: TransactionStore,
        plan: Plan,
    }

    fn setup() -> Fixture {
        let plans = PlanCatalog::new();
        let plan = Plan::dummy_standard();
        plans.insert(plan.clone()).unwrap();
        Fixture {
            reconciler: PaymentReconciler::new(VoucherIssuer::new(EngineConfig::default())),
            plans,
            vouchers: VoucherStore::new(),
            transactions: TransactionStore::new(),
            plan,
        }
    }

    fn succeeded(correlation: &str) -> PaymentNotification {
        PaymentNotification::succeeded(
            CorrelationId::new(correlation),
            "QK12ABCD",
            Decimal::new(200, 0),
        )
    }

    #[test]
    fn success_mints_exactly_one_voucher() {
        let fx = setup();
        let txn = Transaction::dummy_pending(fx.plan.id, "ws_CO_1");
        let id = txn.id;
        fx.transactions.insert(txn).unwrap();

        let outcome = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_1"))
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::VoucherMinted(_)));
        assert_eq!(fx.vouchers.len(), 1);

        let stored = fx.transactions.get(&id).unwrap().value;
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.receipt_code.as_deref(), Some("QK12ABCD"));
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn duplicate_delivery_is_noop() {
        let fx = setup();
        fx.transactions
            .insert(Transaction::dummy_pending(fx.plan.id, "ws_CO_1"))
            .unwrap();

        let first = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_1"))
            .unwrap();
        assert!(matches!(first, ReconcileOutcome::VoucherMinted(_)));

        let second = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_1"))
            .unwrap();
        assert_eq!(second, ReconcileOutcome::AlreadyCompleted);
        assert_eq!(fx.vouchers.len(), 1, "no second voucher under duplicate delivery");
    }

    #[test]
    fn orphan_notification_is_acknowledged() {
        let fx = setup();
        let outcome = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_404"))
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Orphaned);

        let ack = fx
            .reconciler
            .handle(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_404"));
        assert_eq!(ack.result_code, 0);
    }

    #[test]
    fn failure_marks_transaction_failed_once() {
        let fx = setup();
        fx.transactions
            .insert(Transaction::dummy_pending(fx.plan.id, "ws_CO_1"))
            .unwrap();
        let failed =
            PaymentNotification::failed(CorrelationId::new("ws_CO_1"), Some("cancelled".into()));

        let first = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &failed)
            .unwrap();
        assert_eq!(first, ReconcileOutcome::MarkedFailed);

        let second = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &failed)
            .unwrap();
        assert_eq!(second, ReconcileOutcome::AlreadyTerminal);
        assert!(fx.vouchers.is_empty());
    }

    #[test]
    fn failure_after_completion_is_noop() {
        let fx = setup();
        fx.transactions
            .insert(Transaction::dummy_pending(fx.plan.id, "ws_CO_1"))
            .unwrap();
        fx.reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_1"))
            .unwrap();

        let failed = PaymentNotification::failed(CorrelationId::new("ws_CO_1"), None);
        let outcome = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &failed)
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyTerminal);

        let stored = fx
            .transactions
            .get_by_correlation(&CorrelationId::new("ws_CO_1"))
            .unwrap();
        assert_eq!(stored.value.status, TransactionStatus::Completed);
    }

    #[test]
    fn dangling_plan_still_acknowledged() {
        let fx = setup();
        // Transaction references a plan the catalog never had.
        fx.transactions
            .insert(Transaction::dummy_pending(netpass_types::PlanId::new(), "ws_CO_9"))
            .unwrap();

        let err = fx
            .reconciler
            .reconcile(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_9"))
            .unwrap_err();
        assert!(matches!(err, NetpassError::PlanNotFound(_)));

        // The webhook surface still acks to stop provider retries.
        let ack = fx
            .reconciler
            .handle(&fx.plans, &fx.vouchers, &fx.transactions, &succeeded("ws_CO_9"));
        assert_eq!(ack.result_code, 0);
    }
}
