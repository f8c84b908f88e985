//! Payment-provider notifications.
//!
//! The provider delivers a webhook envelope ([`ProviderCallback`]) with a
//! result code and, on success, a metadata item list carrying at least the
//! settled amount and a receipt code. The engine normalizes that into a
//! [`PaymentNotification`] before reconciliation, and always answers with
//! a success [`NotificationAck`] — even for no-ops — so the provider never
//! enters a retry storm.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{constants, CorrelationId, NetpassError, Result};

/// Terminal result of one payment attempt, as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentResult {
    Succeeded {
        receipt_code: String,
        amount: Decimal,
    },
    Failed {
        reason: Option<String>,
    },
}

/// A normalized terminal payment notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub correlation_id: CorrelationId,
    pub result: PaymentResult,
}

impl PaymentNotification {
    #[must_use]
    pub fn succeeded(correlation_id: CorrelationId, receipt_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            correlation_id,
            result: PaymentResult::Succeeded {
                receipt_code: receipt_code.into(),
                amount,
            },
        }
    }

    #[must_use]
    pub fn failed(correlation_id: CorrelationId, reason: Option<String>) -> Self {
        Self {
            correlation_id,
            result: PaymentResult::Failed { reason },
        }
    }
}

/// One name/value pair from the provider's callback metadata list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// The raw webhook envelope as the provider delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCallback {
    pub correlation_id: CorrelationId,
    /// 0 means the payment settled; anything else is a failure.
    pub result_code: i64,
    pub result_desc: Option<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataItem>,
}

impl ProviderCallback {
    fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.metadata
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.value)
    }

    /// Normalize the envelope into a [`PaymentNotification`].
    ///
    /// # Errors
    /// Returns `MalformedNotification` when a success envelope is missing
    /// the receipt code or a parseable amount.
    pub fn into_notification(self) -> Result<PaymentNotification> {
        if self.result_code != constants::PROVIDER_RESULT_SUCCESS {
            return Ok(PaymentNotification::failed(
                self.correlation_id,
                self.result_desc,
            ));
        }

        let receipt_code = self
            .metadata_value(constants::METADATA_RECEIPT)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| NetpassError::MalformedNotification {
                reason: format!("success callback missing {}", constants::METADATA_RECEIPT),
            })?;

        let amount = self
            .metadata_value(constants::METADATA_AMOUNT)
            .and_then(|v| match v {
                Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
                Value::String(s) => s.parse::<Decimal>().ok(),
                _ => None,
            })
            .ok_or_else(|| NetpassError::MalformedNotification {
                reason: format!("success callback missing {}", constants::METADATA_AMOUNT),
            })?;

        Ok(PaymentNotification::succeeded(
            self.correlation_id,
            receipt_code,
            amount,
        ))
    }
}

/// The acknowledgment envelope returned to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAck {
    pub result_code: i64,
    pub result_desc: String,
}

impl NotificationAck {
    /// The one ack the reconciler ever sends. Internal failures are logged,
    /// not surfaced, so at-least-once delivery converges instead of
    /// retrying forever.
    #[must_use]
    pub fn success() -> Self {
        Self {
            result_code: constants::PROVIDER_RESULT_SUCCESS,
            result_desc: "Success".to_string(),
        }
    }
}
