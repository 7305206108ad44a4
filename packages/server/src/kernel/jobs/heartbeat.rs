use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};

/// Last time each job runner reported in.
#[derive(FromRow, Debug, Clone)]
pub struct WorkerHeartbeat {
    pub worker_id: String,
    pub last_seen_at: DateTime<Utc>,
}

impl WorkerHeartbeat {
    pub async fn touch(worker_id: &str, executor: impl PgExecutor<'_>) -> Result<()> {
        sqlx::query(
            "INSERT INTO worker_heartbeats (worker_id, last_seen_at) VALUES ($1, NOW()) \
             ON CONFLICT (worker_id) DO UPDATE SET last_seen_at = EXCLUDED.last_seen_at",
        )
        .bind(worker_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Workers seen within the last `window_secs` seconds.
    pub async fn find_recent(
        window_secs: i64,
        executor: impl PgExecutor<'_>,
    ) -> Result<Vec<WorkerHeartbeat>> {
        let rows = sqlx::query_as::<_, WorkerHeartbeat>(
            "SELECT worker_id, last_seen_at FROM worker_heartbeats \
             WHERE last_seen_at > NOW() - make_interval(secs => $1) \
             ORDER BY last_seen_at DESC",
        )
        .bind(window_secs as f64)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Drop a worker's row on clean shutdown so readiness reflects it quickly.
    pub async fn remove(worker_id: &str, executor: impl PgExecutor<'_>) -> Result<()> {
        sqlx::query("DELETE FROM worker_heartbeats WHERE worker_id = $1")
            .bind(worker_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
