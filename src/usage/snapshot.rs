//! Per-user, per-billing-month usage record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite key of a snapshot: `(user_id, billing_month)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub user_id: String,
    pub billing_month: String,
}

impl SnapshotKey {
    pub fn new(user_id: impl Into<String>, billing_month: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            billing_month: billing_month.into(),
        }
    }
}

/// Consumed quota and plan status for one user in one billing month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub user_id: String,
    pub billing_month: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    pub is_paid: bool,
    pub active_sessions: u32,
    pub project_submissions: u32,
    /// Core id → runs consumed this period.
    #[serde(default)]
    pub core_runs: BTreeMap<String, u32>,
    /// Set by the store on every persist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    /// Zeroed, unpaid snapshot for a fresh period.
    pub fn empty(user_id: impl Into<String>, billing_month: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            billing_month: billing_month.into(),
            plan_id: None,
            is_paid: false,
            active_sessions: 0,
            project_submissions: 0,
            core_runs: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn key(&self) -> SnapshotKey {
        SnapshotKey::new(self.user_id.clone(), self.billing_month.clone())
    }

    /// Runs consumed by `core_id` this period (0 if never run).
    pub fn core_run_count(&self, core_id: &str) -> u32 {
        self.core_runs.get(core_id).copied().unwrap_or(0)
    }
}
