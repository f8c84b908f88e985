//! # netpass-engine
//!
//! **The voucher lifecycle engine**: code generation, issuance, payment
//! reconciliation, the access gate, and session accounting over the
//! stores in `netpass-store`.
//!
//! ## Components
//!
//! 1. **`CodeGenerator`**: collision-free `XXXX-XXXX` codes
//! 2. **`VoucherIssuer`**: single (payment-bound) and bulk issuance
//! 3. **`PaymentReconciler`**: idempotent webhook reconciliation — exactly
//!    one voucher per completed transaction
//! 4. **`AccessGate`**: the single-use redemption decision, one winner
//!    under concurrency
//! 5. **`SessionAccountant`**: cumulative last-write-wins usage ingestion
//!    with quota-exhaustion termination
//! 6. **`status::snapshot`** and **`sweeper::sweep_expired`**: the
//!    read path and the batch expiry pass
//!
//! [`NetpassEngine`] bundles the stores and components behind one
//! `&self` handle for concurrent hosts.

pub mod accountant;
pub mod codegen;
pub mod engine;
pub mod gate;
pub mod issuance;
pub mod reconciler;
pub mod status;
pub mod sweeper;

pub use accountant::{IngestOutcome, SessionAccountant};
pub use codegen::CodeGenerator;
pub use engine::NetpassEngine;
pub use gate::{AccessDecision, AccessGate, AccessRequest, RejectReason};
pub use issuance::VoucherIssuer;
pub use reconciler::{PaymentReconciler, ReconcileOutcome};
pub use status::{snapshot, SessionUsage, StatusSnapshot};
pub use sweeper::sweep_expired;
