//! Usage snapshot persistence.
//!
//! [`SnapshotStore`] is the only seam between quota logic and storage. Two
//! backends exist:
//!
//! - [`MemorySnapshotStore`]: per-process map, used when no database is
//!   configured (development and tests).
//! - [`PostgresSnapshotStore`]: the `usage_limits` table.
//!
//! The backend is picked once by [`from_config`]; nothing else branches on it.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::snapshot::UsageSnapshot;

pub use memory::MemorySnapshotStore;
pub use postgres::PostgresSnapshotStore;

/// Mutation run by [`SnapshotStore::update`] while the key is held.
///
/// Returning `Err` aborts the update; nothing is persisted.
pub type SnapshotMutation = Box<dyn FnOnce(UsageSnapshot) -> Result<UsageSnapshot> + Send>;

/// Load/persist access to usage snapshots keyed by `(user_id, billing_month)`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Short backend name for logs and `/health`.
    fn name(&self) -> &'static str;

    /// Return the snapshot for the key, creating a zeroed one if missing.
    async fn load(&self, user_id: &str, billing_month: &str) -> Result<UsageSnapshot>;

    /// Upsert `snapshot`, stamping `updated_at`. Returns the stored value.
    async fn persist(&self, snapshot: UsageSnapshot) -> Result<UsageSnapshot>;

    /// Load, mutate and persist one key as a single serialized step.
    ///
    /// Concurrent updates of the same key observe each other's writes;
    /// updates of different keys do not block each other.
    async fn update(
        &self,
        user_id: &str,
        billing_month: &str,
        mutation: SnapshotMutation,
    ) -> Result<UsageSnapshot>;
}

/// Build the configured backend.
///
/// A missing `database.url` selects the in-process store. A configured URL
/// always selects Postgres: connection failures surface as
/// `StoreUnavailable` instead of silently falling back to memory.
pub async fn from_config(config: &DatabaseConfig) -> Result<Arc<dyn SnapshotStore>> {
    match config.url.as_deref() {
        Some(url) => {
            let store = PostgresSnapshotStore::connect(url, config).await?;
            info!(backend = store.name(), "Usage store ready");
            Ok(Arc::new(store))
        }
        None => {
            warn!("No database configured; usage quotas are kept in memory and reset on restart");
            Ok(Arc::new(MemorySnapshotStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_without_url_uses_memory() {
        let store = from_config(&DatabaseConfig::default()).await.unwrap();
        assert_eq!(store.name(), "memory");
    }
}
