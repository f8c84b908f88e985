//! Payment transactions.
//!
//! A `Transaction` records one payment attempt. The initiation collaborator
//! creates it as Pending and stores the provider's correlation id on it;
//! the reconciler mutates it exactly once, on terminal webhook receipt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, CorrelationId, NetpassError, PayerId, PlanId, Result, TransactionId};

/// Lifecycle status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    /// Completed, Failed, and Cancelled never transition again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One payment attempt against a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub payer: PayerId,
    pub plan: PlanId,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    /// Provider echo from payment initiation; the webhook carries it back.
    pub correlation_id: Option<CorrelationId>,
    /// Provider receipt code, set on completion.
    pub receipt_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    #[must_use]
    pub fn new(payer: PayerId, plan: PlanId, amount: Decimal) -> Self {
        Self {
            id: TransactionId::new(),
            payer,
            plan,
            amount,
            currency: constants::DEFAULT_CURRENCY.to_string(),
            status: TransactionStatus::Pending,
            correlation_id: None,
            receipt_code: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Attach the provider's correlation id after payment initiation.
    #[must_use]
    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Mark the payment settled. Only a Pending transaction completes.
    pub fn complete(&mut self, receipt_code: impl Into<String>, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(NetpassError::Internal(format!(
                "transaction {} is already {}",
                self.id, self.status
            )));
        }
        self.status = TransactionStatus::Completed;
        self.receipt_code = Some(receipt_code.into());
        self.completed_at = Some(at);
        Ok(())
    }

    /// Mark the payment failed. No-op guard lives with the reconciler;
    /// this transition itself only runs from Pending.
    pub fn fail(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(NetpassError::Internal(format!(
                "transaction {} is already {}",
                self.id, self.status
            )));
        }
        self.status = TransactionStatus::Failed;
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Transaction {
    /// A pending transaction with a correlation id already attached.
    #[must_use]
    pub fn dummy_pending(plan: PlanId, correlation: &str) -> Self {
        Self::new(PayerId::new(), plan, Decimal::new(200, 0))
            .with_correlation(CorrelationId::new(correlation))
    }
}
