//! Postgres-backed snapshot store (`usage_limits` table).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::{OintmentError, Result};
use crate::usage::snapshot::UsageSnapshot;

use super::{SnapshotMutation, SnapshotStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS usage_limits (
    user_id             TEXT        NOT NULL,
    billing_month       TEXT        NOT NULL,
    plan_id             TEXT,
    is_paid             BOOLEAN     NOT NULL DEFAULT FALSE,
    active_sessions     INTEGER     NOT NULL DEFAULT 0,
    project_submissions INTEGER     NOT NULL DEFAULT 0,
    core_runs           JSONB       NOT NULL DEFAULT '{}'::jsonb,
    updated_at          TIMESTAMPTZ,
    PRIMARY KEY (user_id, billing_month)
)
"#;

const INSERT_EMPTY: &str = r#"
INSERT INTO usage_limits (user_id, billing_month)
VALUES ($1, $2)
ON CONFLICT (user_id, billing_month) DO NOTHING
"#;

const SELECT_ROW: &str = r#"
SELECT user_id, billing_month, plan_id, is_paid, active_sessions,
       project_submissions, core_runs, updated_at
FROM usage_limits
WHERE user_id = $1 AND billing_month = $2
"#;

const SELECT_ROW_FOR_UPDATE: &str = r#"
SELECT user_id, billing_month, plan_id, is_paid, active_sessions,
       project_submissions, core_runs, updated_at
FROM usage_limits
WHERE user_id = $1 AND billing_month = $2
FOR UPDATE
"#;

const UPSERT_ROW: &str = r#"
INSERT INTO usage_limits (user_id, billing_month, plan_id, is_paid, active_sessions,
                          project_submissions, core_runs, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (user_id, billing_month) DO UPDATE SET
    plan_id = EXCLUDED.plan_id,
    is_paid = EXCLUDED.is_paid,
    active_sessions = EXCLUDED.active_sessions,
    project_submissions = EXCLUDED.project_submissions,
    core_runs = EXCLUDED.core_runs,
    updated_at = EXCLUDED.updated_at
"#;

#[derive(sqlx::FromRow)]
struct UsageRow {
    user_id: String,
    billing_month: String,
    plan_id: Option<String>,
    is_paid: bool,
    active_sessions: i32,
    project_submissions: i32,
    core_runs: Json<BTreeMap<String, i32>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<UsageRow> for UsageSnapshot {
    fn from(row: UsageRow) -> Self {
        Self {
            user_id: row.user_id,
            billing_month: row.billing_month,
            plan_id: row.plan_id,
            is_paid: row.is_paid,
            active_sessions: to_count(row.active_sessions),
            project_submissions: to_count(row.project_submissions),
            core_runs: row
                .core_runs
                .0
                .into_iter()
                .map(|(core, runs)| (core, to_count(runs)))
                .collect(),
            updated_at: row.updated_at,
        }
    }
}

fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_column(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| OintmentError::StoreUnavailable(format!("counter {value} overflows column")))
}

/// Snapshot store persisting to Postgres.
///
/// `update` holds a row lock (`SELECT ... FOR UPDATE`) for the whole
/// load → mutate → persist step, which serializes writers of the same key
/// across processes.
#[derive(Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Connect eagerly and create the table if it does not exist.
    #[instrument(skip_all, fields(max_connections = config.max_connections))]
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!("PostgreSQL usage store connected");
        Ok(store)
    }

    /// Build the pool without connecting; errors surface on first use.
    pub fn connect_lazy(url: &str, config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn load_locked(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        billing_month: &str,
    ) -> Result<UsageSnapshot> {
        sqlx::query(INSERT_EMPTY)
            .bind(user_id)
            .bind(billing_month)
            .execute(&mut **tx)
            .await?;
        let row: UsageRow = sqlx::query_as(SELECT_ROW_FOR_UPDATE)
            .bind(user_id)
            .bind(billing_month)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.into())
    }

    async fn write(
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &mut UsageSnapshot,
    ) -> Result<()> {
        let stamp = Utc::now();
        let core_runs = snapshot
            .core_runs
            .iter()
            .map(|(core, runs)| Ok((core.clone(), to_column(*runs)?)))
            .collect::<Result<BTreeMap<String, i32>>>()?;

        sqlx::query(UPSERT_ROW)
            .bind(&snapshot.user_id)
            .bind(&snapshot.billing_month)
            .bind(&snapshot.plan_id)
            .bind(snapshot.is_paid)
            .bind(to_column(snapshot.active_sessions)?)
            .bind(to_column(snapshot.project_submissions)?)
            .bind(Json(core_runs))
            .bind(stamp)
            .execute(&mut **tx)
            .await?;

        snapshot.updated_at = Some(stamp);
        Ok(())
    }
}

/// The mutation's error wins over a failed rollback; the row lock is released
/// when the connection drops either way.
fn rejected(
    err: OintmentError,
    rollback: std::result::Result<(), sqlx::Error>,
) -> OintmentError {
    if let Err(rollback) = rollback {
        warn!(error = %rollback, "Rollback after rejected usage update failed");
    }
    err
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self, user_id: &str, billing_month: &str) -> Result<UsageSnapshot> {
        sqlx::query(INSERT_EMPTY)
            .bind(user_id)
            .bind(billing_month)
            .execute(&self.pool)
            .await?;
        let row: UsageRow = sqlx::query_as(SELECT_ROW)
            .bind(user_id)
            .bind(billing_month)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn persist(&self, mut snapshot: UsageSnapshot) -> Result<UsageSnapshot> {
        let mut tx = self.pool.begin().await?;
        Self::write(&mut tx, &mut snapshot).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn update(
        &self,
        user_id: &str,
        billing_month: &str,
        mutation: SnapshotMutation,
    ) -> Result<UsageSnapshot> {
        let mut tx = self.pool.begin().await?;
        let current = Self::load_locked(&mut tx, user_id, billing_month).await?;

        let mut next = match mutation(current) {
            Ok(next) => next,
            Err(err) => {
                debug!(user_id, billing_month, "Usage update rejected; rolling back");
                return Err(rejected(err, tx.rollback().await));
            }
        };

        Self::write(&mut tx, &mut next).await?;
        tx.commit().await?;
        Ok(next)
    }
}
