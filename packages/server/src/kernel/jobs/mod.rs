//! Job infrastructure for background command execution.
//!
//! - [`PostgresJobQueue`] - database-backed job queue
//! - [`JobRegistry`] - job type → typed handler
//! - [`JobRunner`] - polls, executes and records outcomes
//! - [`JobCancellations`] - in-process cancellation of running jobs
//!
//! ```text
//! API handler
//!     └─► deps.job_queue.enqueue_command(&cmd)  (INSERT INTO jobs)
//!
//! JobRunner (server process or `worker` binary)
//!     ├─► claim (FOR UPDATE SKIP LOCKED)
//!     ├─► JobRegistry::execute(job, JobContext)
//!     └─► mark succeeded / failed / cancelled
//! ```
//!
//! Job types and their handlers live in their domains; this module only
//! provides the plumbing.

mod cancellation;
mod heartbeat;
mod job;
mod queue;
mod registry;
mod runner;

pub use cancellation::{JobCancellations, JobCancelled};
pub use heartbeat::WorkerHeartbeat;
pub use job::{Job, JobStatus, NewJob};
pub use queue::{CommandMeta, EnqueueResult, JobQueue, PostgresJobQueue};
pub use registry::{JobContext, JobRegistry, SharedJobRegistry};
pub use runner::{JobOutcome, JobRunner, JobRunnerConfig};
