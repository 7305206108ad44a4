//! Job runner service for processing background jobs.
//!
//! ```text
//! JobRunner
//!     │
//!     ├─► Heartbeat (worker_heartbeats)
//!     ├─► Claim a batch (JobQueue::claim)
//!     ├─► For each job: register CancellationToken,
//!     │       race JobRegistry::execute against the token
//!     └─► Mark succeeded / failed / cancelled
//! ```
//!
//! Jobs run once. A failure is recorded on the job row and surfaced by the
//! domain (e.g. a failed course); nothing is re-queued automatically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::cancellation::JobCancelled;
use super::heartbeat::WorkerHeartbeat;
use super::job::Job;
use super::registry::{JobContext, SharedJobRegistry};
use crate::kernel::ServerDeps;

/// Configuration for the job runner.
#[derive(Debug, Clone)]
pub struct JobRunnerConfig {
    /// Maximum number of jobs to claim at once
    pub batch_size: i64,
    /// How long to wait when no jobs are available
    pub poll_interval: Duration,
    /// Worker ID for this instance
    pub worker_id: String,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            poll_interval: Duration::from_secs(2),
            worker_id: format!("runner-{}", Uuid::new_v4()),
        }
    }
}

impl JobRunnerConfig {
    pub fn with_worker_id(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            ..Default::default()
        }
    }
}

/// How a single job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

/// Background service that processes jobs from the queue.
pub struct JobRunner {
    registry: SharedJobRegistry,
    deps: Arc<ServerDeps>,
    config: JobRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(registry: SharedJobRegistry, deps: Arc<ServerDeps>) -> Self {
        Self::with_config(registry, deps, JobRunnerConfig::default())
    }

    pub fn with_config(
        registry: SharedJobRegistry,
        deps: Arc<ServerDeps>,
        config: JobRunnerConfig,
    ) -> Self {
        Self {
            registry,
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Call `store(true, Ordering::SeqCst)` on the returned flag to stop the loop.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run the job runner until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            worker_id = %self.config.worker_id,
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            job_types = ?self.registry.registered_types(),
            "job runner starting"
        );

        while !self.is_shutdown_requested() {
            match self.process_available().await {
                Ok(0) => tokio::time::sleep(self.config.poll_interval).await,
                Ok(count) => debug!(count, "processed jobs"),
                Err(e) => {
                    error!(error = %e, "job runner iteration failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        if let Err(e) = WorkerHeartbeat::remove(&self.config.worker_id, &self.deps.db_pool).await {
            warn!(error = %e, "failed to remove worker heartbeat");
        }
        info!(worker_id = %self.config.worker_id, "job runner stopped");
        Ok(())
    }

    /// Run until Ctrl+C is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }

    /// One heartbeat + claim + execute pass. Returns the number of jobs run.
    pub async fn process_available(&self) -> Result<usize> {
        let queue = &self.deps.job_queue;
        queue.heartbeat(&self.config.worker_id).await?;

        let jobs = queue
            .claim(&self.config.worker_id, self.config.batch_size)
            .await?;
        let count = jobs.len();

        for job in jobs {
            let outcome = self.execute(&job).await;
            let recorded = match &outcome {
                JobOutcome::Succeeded => queue.mark_succeeded(job.id).await,
                JobOutcome::Failed(message) => queue.mark_failed(job.id, message).await,
                JobOutcome::Cancelled => queue.mark_cancelled(job.id, "cancelled").await,
            };
            if let Err(e) = recorded {
                error!(job_id = %job.id, error = %e, "failed to record job outcome");
            }
        }

        Ok(count)
    }

    async fn execute(&self, job: &Job) -> JobOutcome {
        let cancellations = &self.deps.job_cancellations;
        let token = cancellations.register(job.id);
        let ctx = JobContext {
            job_id: job.id,
            deps: self.deps.clone(),
            cancel: token.clone(),
        };

        let span = tracing::info_span!("job", job_id = %job.id, job_type = %job.job_type);
        let outcome = async {
            debug!("executing job");
            let result = tokio::select! {
                result = self.registry.execute(job, ctx) => result,
                _ = token.cancelled() => Err(JobCancelled.into()),
            };

            match result {
                Ok(()) => {
                    info!("job succeeded");
                    JobOutcome::Succeeded
                }
                Err(e) if e.downcast_ref::<JobCancelled>().is_some() => {
                    info!("job cancelled");
                    JobOutcome::Cancelled
                }
                Err(e) => {
                    warn!(error = %e, "job failed");
                    JobOutcome::Failed(format!("{e:#}"))
                }
            }
        }
        .instrument(span)
        .await;

        cancellations.remove(job.id);
        outcome
    }
}
