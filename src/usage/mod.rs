//! Per-user, per-billing-month usage quotas.
//!
//! Control flow for every request:
//! billing period → [`SnapshotStore`] load → [`enforcer::apply`] →
//! [`SnapshotStore`] persist, with the middle three steps serialized per key.

pub mod enforcer;
pub mod period;
pub mod plan;
pub mod service;
pub mod snapshot;
pub mod store;

pub use enforcer::UsageAction;
pub use period::{billing_month, current_billing_month};
pub use plan::{summarize_core_runs, Plan, PlanLimits, MARKETPLACE_PLAN_ID};
pub use service::UsageService;
pub use snapshot::{SnapshotKey, UsageSnapshot};
pub use store::{MemorySnapshotStore, PostgresSnapshotStore, SnapshotStore};
