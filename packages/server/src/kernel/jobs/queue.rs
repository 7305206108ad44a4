//! PostgreSQL-backed job queue implementation.
//!
//! Commands are serialized to JSON and stored in the `jobs` table. Workers
//! claim them with `FOR UPDATE SKIP LOCKED`, so the API process and any
//! number of standalone workers can share one queue.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::heartbeat::WorkerHeartbeat;
use super::job::{Job, JobStatus, NewJob};
use crate::common::JobId;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Command was enqueued, returns new job ID
    Created(JobId),
    /// An active job already holds the idempotency key
    Duplicate(JobId),
}

impl EnqueueResult {
    pub fn job_id(&self) -> JobId {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// Metadata for command serialization.
///
/// Commands implement this trait to name their job type and, optionally,
/// the entity they act on and an idempotency key.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// If provided, only one pending/running job may hold this key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    /// Entity the job acts on (stored as `reference_id`).
    fn reference_id(&self) -> Option<Uuid> {
        None
    }
}

/// Storage and retrieval of serialized commands for background execution.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for immediate execution.
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueResult>;

    /// Claim up to `limit` pending jobs for `worker_id`.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>>;

    async fn mark_succeeded(&self, job_id: JobId) -> Result<()>;

    async fn mark_failed(&self, job_id: JobId, error: &str) -> Result<()>;

    /// Record that a running job stopped because it was cancelled.
    async fn mark_cancelled(&self, job_id: JobId, reason: &str) -> Result<()>;

    /// Cancel a pending job. Running jobs are stopped through their
    /// cancellation token instead.
    async fn cancel(&self, job_id: JobId) -> Result<bool>;

    async fn find_by_id(&self, job_id: JobId) -> Result<Option<Job>>;

    /// Record worker liveness (used by the readiness probe).
    async fn heartbeat(&self, worker_id: &str) -> Result<()>;
}

impl dyn JobQueue {
    /// Serialize a typed command and enqueue it under a fresh id.
    pub async fn enqueue_command<C>(&self, command: &C) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Sync,
    {
        self.enqueue_command_as(JobId::new(), command).await
    }

    /// Serialize a typed command and enqueue it under `job_id`.
    pub async fn enqueue_command_as<C>(&self, job_id: JobId, command: &C) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Sync,
    {
        let job = NewJob {
            id: job_id,
            job_type: command.command_type().to_string(),
            args: serde_json::to_value(command)?,
            reference_id: command.reference_id(),
            idempotency_key: command.idempotency_key(),
        };
        self.enqueue(job).await
    }
}

/// PostgreSQL-backed job queue implementation.
#[derive(Clone)]
pub struct PostgresJobQueue {
    pool: PgPool,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<EnqueueResult> {
        if let Some(key) = &job.idempotency_key {
            if let Some(existing) = Job::find_active_by_idempotency_key(key, &self.pool).await? {
                debug!(job_id = %existing.id, idempotency_key = %key, "duplicate job enqueue");
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let inserted = Job::insert(&job, &self.pool).await?;
        info!(job_id = %inserted.id, job_type = %inserted.job_type, "job enqueued");
        Ok(EnqueueResult::Created(inserted.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<Job>> {
        Job::claim(limit, worker_id, &self.pool).await
    }

    async fn mark_succeeded(&self, job_id: JobId) -> Result<()> {
        Job::finish(job_id, JobStatus::Succeeded, None, &self.pool).await?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: JobId, error: &str) -> Result<()> {
        Job::finish(job_id, JobStatus::Failed, Some(error), &self.pool).await?;
        Ok(())
    }

    async fn mark_cancelled(&self, job_id: JobId, reason: &str) -> Result<()> {
        Job::finish(job_id, JobStatus::Cancelled, Some(reason), &self.pool).await?;
        Ok(())
    }

    async fn cancel(&self, job_id: JobId) -> Result<bool> {
        Job::cancel_pending(job_id, &self.pool).await
    }

    async fn find_by_id(&self, job_id: JobId) -> Result<Option<Job>> {
        Job::find_by_id(job_id, &self.pool).await
    }

    async fn heartbeat(&self, worker_id: &str) -> Result<()> {
        WorkerHeartbeat::touch(worker_id, &self.pool).await
    }
}
