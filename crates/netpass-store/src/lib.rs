//! # netpass-store
//!
//! **Authoritative state**: vouchers, transactions, sessions, and the plan
//! catalog, with the atomic compare-and-set primitive every engine
//! mutation goes through.
//!
//! ## Architecture
//!
//! 1. **`CasMap`**: versioned records with per-key conditional replace —
//!    the serialization point for all concurrent mutation
//! 2. **`VoucherStore`**: keyed by globally unique code; insert rejects
//!    collisions so issuance can generate-and-retry
//! 3. **`TransactionStore`**: keyed by id, secondary index by provider
//!    correlation id for webhook resolution
//! 4. **`SessionStore`**: keyed by opaque id, active-session index
//!    enforcing at most one Active session per voucher
//! 5. **`PlanCatalog`**: read-mostly, immutable-after-creation plans
//!
//! Races resolve the same way everywhere: the losing writer's CAS fails,
//! it re-reads, and answers from the post-race state.

pub mod kv;
pub mod plan_catalog;
pub mod session_store;
pub mod transaction_store;
pub mod voucher_store;

pub use kv::{CasMap, Versioned};
pub use plan_catalog::PlanCatalog;
pub use session_store::SessionStore;
pub use transaction_store::TransactionStore;
pub use voucher_store::VoucherStore;
