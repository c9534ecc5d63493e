//! In-process snapshot store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::usage::snapshot::{SnapshotKey, UsageSnapshot};

use super::{SnapshotMutation, SnapshotStore};

/// Snapshot store backed by a concurrent map.
///
/// Each key owns its own async mutex, so a slow update for one user never
/// stalls another. The map shard lock is only held while looking up or
/// inserting a slot, never across an `.await`.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slots: DashMap<SnapshotKey, Arc<Mutex<UsageSnapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(user, month)` keys seen so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, user_id: &str, billing_month: &str) -> Arc<Mutex<UsageSnapshot>> {
        let key = SnapshotKey::new(user_id, billing_month);
        Arc::clone(
            self.slots
                .entry(key)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(UsageSnapshot::empty(user_id, billing_month)))
                })
                .value(),
        )
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, user_id: &str, billing_month: &str) -> Result<UsageSnapshot> {
        let slot = self.slot(user_id, billing_month);
        let guard = slot.lock().await;
        Ok(guard.clone())
    }

    async fn persist(&self, mut snapshot: UsageSnapshot) -> Result<UsageSnapshot> {
        let slot = self.slot(&snapshot.user_id, &snapshot.billing_month);
        let mut guard = slot.lock().await;
        snapshot.updated_at = Some(Utc::now());
        *guard = snapshot.clone();
        Ok(snapshot)
    }

    async fn update(
        &self,
        user_id: &str,
        billing_month: &str,
        mutation: SnapshotMutation,
    ) -> Result<UsageSnapshot> {
        let slot = self.slot(user_id, billing_month);
        let mut guard = slot.lock().await;
        let mut next = mutation(guard.clone())?;
        next.updated_at = Some(Utc::now());
        *guard = next.clone();
        Ok(next)
    }
}
