//! # netpass-types
//!
//! Shared types, errors, and configuration for the **Netpass** prepaid
//! network-access engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`VoucherCode`], [`PlanId`], [`TransactionId`], [`SessionId`], [`PayerId`], [`CorrelationId`], [`ClientId`]
//! - **Plan model**: [`Plan`]
//! - **Transaction model**: [`Transaction`], [`TransactionStatus`]
//! - **Voucher model**: [`Voucher`], [`VoucherStatus`]
//! - **Session model**: [`Session`], [`SessionStatus`]
//! - **Accounting model**: [`UsageReport`], [`ReportKind`], [`AccountingAck`]
//! - **Provider model**: [`ProviderCallback`], [`PaymentNotification`], [`NotificationAck`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`NetpassError`] with `NP_ERR_` prefix codes
//! - **Constants**: system-wide defaults and unit conversions

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod notification;
pub mod plan;
pub mod report;
pub mod session;
pub mod transaction;
pub mod voucher;

// Re-export all primary types at crate root for ergonomic imports:
//   use netpass_types::{Voucher, VoucherStatus, UsageReport, ...};

pub use config::*;
pub use error::*;
pub use ids::*;
pub use notification::*;
pub use plan::*;
pub use report::*;
pub use session::*;
pub use transaction::*;
pub use voucher::*;

// Constants are accessed via `netpass_types::constants::FOO`
// (not re-exported to avoid name collisions).
