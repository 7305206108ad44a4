// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use course_builder::kernel::jobs::{JobRunner, JobRunnerConfig};
use course_builder::server::{build_app, build_job_registry, build_server_deps, HttpSettings};
use course_builder::{telemetry, Config};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env first so LOG_FORMAT/RUST_LOG apply)
    let config = Config::from_env().context("Failed to load configuration")?;

    telemetry::init_tracing();
    tracing::info!("Starting AI Course Builder API");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let deps = Arc::new(build_server_deps(&config, pool)?);

    // In-process job runner (disable with RUN_JOB_RUNNER=false and run `worker`)
    let runner_shutdown = if config.run_job_runner {
        let runner_config = JobRunnerConfig {
            poll_interval: config.job_poll_interval,
            ..JobRunnerConfig::with_worker_id(format!("api-{}", uuid::Uuid::new_v4()))
        };
        let runner = JobRunner::with_config(build_job_registry(), deps.clone(), runner_config);
        let shutdown = runner.shutdown_handle();
        tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                tracing::error!(error = %e, "Job runner exited with error");
            }
        });
        Some(shutdown)
    } else {
        tracing::info!("In-process job runner disabled");
        None
    };

    let app = build_app(deps, &HttpSettings::from(&config));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    if let Some(shutdown) = runner_shutdown {
        shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    Ok(())
}
