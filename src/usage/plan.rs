//! Marketplace plan definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of the plan sold through the GitHub Marketplace listing.
pub const MARKETPLACE_PLAN_ID: &str = "github-marketplace-pro";

/// Per-user caps enforced for one billing month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    /// Concurrently open sessions.
    pub max_sessions: u32,
    /// Project submissions per billing month.
    pub max_project_submissions_per_month: u32,
    /// Runs per compute core per billing month.
    pub max_runs_per_core: u32,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            max_project_submissions_per_month: 30,
            max_runs_per_core: 3,
        }
    }
}

/// The paid plan that unlocks ingestion, roasting and visualization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: u32,
    pub currency: String,
    pub limits: PlanLimits,
    pub marketing_highlights: Vec<String>,
}

impl Plan {
    /// The marketplace plan with the given limits.
    pub fn marketplace(limits: PlanLimits) -> Self {
        Self {
            id: MARKETPLACE_PLAN_ID.to_string(),
            name: "Mission Control Pro".to_string(),
            description: "Paid plan purchased via the GitHub Marketplace to unlock \
                          ingestion, AI and visualization features."
                .to_string(),
            price: 49,
            currency: "USD".to_string(),
            limits,
            marketing_highlights: vec![
                "Verified payment before enabling ingest, roast and AI flows".to_string(),
                "Session throttling to keep workloads resilient to DDoS attempts".to_string(),
                "Usage tracking for submissions and compute cores".to_string(),
            ],
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::marketplace(PlanLimits::default())
    }
}

/// Render per-core run counts as a single line for dashboards.
pub fn summarize_core_runs(core_runs: &BTreeMap<String, u32>) -> String {
    if core_runs.is_empty() {
        return "No cores have been used yet.".to_string();
    }
    core_runs
        .iter()
        .map(|(core, runs)| {
            let suffix = if *runs == 1 { "" } else { "s" };
            format!("{core}: {runs} run{suffix}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}
