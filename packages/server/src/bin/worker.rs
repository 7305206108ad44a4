//! Standalone job worker
//!
//! Runs the same job runner the API embeds, for deployments that keep
//! generation out of the API process (`RUN_JOB_RUNNER=false`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use course_builder::kernel::jobs::{JobRunner, JobRunnerConfig};
use course_builder::server::{build_job_registry, build_server_deps};
use course_builder::{telemetry, Config};
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Course generation job worker")]
struct Cli {
    /// Worker id reported in heartbeats (defaults to worker-<uuid>)
    #[arg(long, env = "WORKER_ID")]
    worker_id: Option<String>,

    /// Jobs claimed per poll
    #[arg(long, env = "WORKER_BATCH_SIZE", default_value_t = 1)]
    batch_size: i64,

    /// Sleep between polls when the queue is empty
    #[arg(long, env = "JOB_POLL_INTERVAL_MS", default_value_t = 2000)]
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    telemetry::init_tracing();

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let deps = Arc::new(build_server_deps(&config, pool)?);

    let worker_id = cli
        .worker_id
        .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));
    let runner_config = JobRunnerConfig {
        batch_size: cli.batch_size.max(1),
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        ..JobRunnerConfig::with_worker_id(worker_id)
    };

    JobRunner::with_config(build_job_registry(), deps, runner_config)
        .run_until_shutdown()
        .await
}
