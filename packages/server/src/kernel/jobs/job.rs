//! Job model for background command execution.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, FromRow, PgExecutor, Type};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::common::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownJobStatus(String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

// Stored as TEXT with a CHECK constraint rather than a Postgres enum type.
impl Type<Postgres> for JobStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl Encode<'_, Postgres> for JobStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

impl Decode<'_, Postgres> for JobStatus {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// A row of the `jobs` table.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub args: serde_json::Value,
    pub status: JobStatus,
    pub reference_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
    pub worker_id: Option<String>,
    pub error_message: Option<String>,
    pub run_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Chosen by the caller so it can be stored elsewhere before the job
    /// becomes claimable.
    pub id: JobId,
    pub job_type: String,
    pub args: serde_json::Value,
    pub reference_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

const JOB_COLUMNS: &str = "id, job_type, args, status, reference_id, idempotency_key, worker_id, \
     error_message, run_at, started_at, finished_at, created_at, updated_at";

impl Job {
    pub async fn find_by_id(id: JobId, executor: impl PgExecutor<'_>) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(job)
    }

    /// Active (pending or running) job holding the given idempotency key.
    pub async fn find_active_by_idempotency_key(
        key: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE idempotency_key = $1 AND status IN ('pending', 'running') \
             LIMIT 1"
        ))
        .bind(key)
        .fetch_optional(executor)
        .await?;
        Ok(job)
    }

    pub async fn insert(new: &NewJob, executor: impl PgExecutor<'_>) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs (id, job_type, args, reference_id, idempotency_key) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(new.id)
        .bind(&new.job_type)
        .bind(&new.args)
        .bind(new.reference_id)
        .bind(&new.idempotency_key)
        .fetch_one(executor)
        .await?;
        Ok(job)
    }

    /// Claim up to `limit` due jobs for `worker_id`.
    ///
    /// `FOR UPDATE SKIP LOCKED` lets several workers poll the same table
    /// without handing one job to two of them.
    pub async fn claim(
        limit: i64,
        worker_id: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<Vec<Job>> {
        let mut jobs = sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs SET status = 'running', worker_id = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id IN ( \
                 SELECT id FROM jobs \
                 WHERE status = 'pending' AND run_at <= NOW() \
                 ORDER BY run_at, id \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(limit)
        .bind(worker_id)
        .fetch_all(executor)
        .await?;

        // RETURNING order is unspecified
        jobs.sort_by(|a, b| a.run_at.cmp(&b.run_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    /// Move a running job to a terminal status. Returns false if the job was
    /// not running (already cancelled, or finished by someone else).
    pub async fn finish(
        id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
        executor: impl PgExecutor<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2, error_message = $3, finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cancel a job that has not started yet.
    pub async fn cancel_pending(id: JobId, executor: impl PgExecutor<'_>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', finished_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
