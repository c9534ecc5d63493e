//! Usage service: billing period → store → enforcer → store.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{OintmentError, Result};

use super::enforcer::{self, UsageAction};
use super::period::current_billing_month;
use super::plan::Plan;
use super::snapshot::UsageSnapshot;
use super::store::SnapshotStore;

/// Entry point for reading and metering usage.
///
/// Holds the plan in force and the snapshot backend chosen at startup. All
/// mutations go through [`SnapshotStore::update`], so concurrent requests for
/// the same user and month cannot both consume the last free slot.
#[derive(Clone)]
pub struct UsageService {
    store: Arc<dyn SnapshotStore>,
    plan: Plan,
}

impl UsageService {
    pub fn new(store: Arc<dyn SnapshotStore>, plan: Plan) -> Self {
        Self { store, plan }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Current-period snapshot for `user_id`, created on first access.
    pub async fn snapshot(&self, user_id: &str) -> Result<UsageSnapshot> {
        let billing_month = current_billing_month();
        self.store.load(user_id, &billing_month).await
    }

    /// Validate and record one metered action for the current period.
    ///
    /// `action` is the wire name (`"start-session"`, `"core-run"`, ...);
    /// unknown names fail with [`OintmentError::InvalidAction`].
    #[instrument(skip(self), fields(billing_month))]
    pub async fn record(
        &self,
        user_id: &str,
        action: &str,
        core_id: Option<&str>,
    ) -> Result<UsageSnapshot> {
        let action: UsageAction = action.parse()?;
        let billing_month = current_billing_month();
        tracing::Span::current().record("billing_month", billing_month.as_str());

        let limits = self.plan.limits;
        let core_id = core_id.map(str::to_string);
        let result = self
            .store
            .update(
                user_id,
                &billing_month,
                Box::new(move |snapshot: UsageSnapshot| {
                    enforcer::apply(&snapshot, &limits, action, core_id.as_deref())
                }),
            )
            .await;

        match &result {
            Ok(snapshot) => debug!(
                active_sessions = snapshot.active_sessions,
                project_submissions = snapshot.project_submissions,
                "Usage recorded"
            ),
            Err(OintmentError::LimitExceeded {
                current, limit, ..
            }) => info!(current, limit, "Usage limit reached"),
            Err(err) => warn!(error = %err, "Usage update failed"),
        }
        result
    }

    /// Set plan id and paid flag on the current-period snapshot.
    #[instrument(skip(self))]
    pub async fn set_plan(
        &self,
        user_id: &str,
        plan_id: &str,
        is_paid: bool,
    ) -> Result<UsageSnapshot> {
        let billing_month = current_billing_month();
        let plan_id = plan_id.to_string();
        let snapshot = self
            .store
            .update(
                user_id,
                &billing_month,
                Box::new(move |mut snapshot: UsageSnapshot| {
                    snapshot.plan_id = Some(plan_id);
                    snapshot.is_paid = is_paid;
                    Ok(snapshot)
                }),
            )
            .await?;
        info!(billing_month = %billing_month, "Plan status updated");
        Ok(snapshot)
    }
}
