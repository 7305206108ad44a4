//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. Each test
//! gets its own freshly migrated database inside it, so job runners in
//! parallel tests never claim each other's jobs.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use course_builder::kernel::jobs::{JobRunner, JobRunnerConfig};
use course_builder::kernel::{ServerDeps, TestDependencies};
use course_builder::server::{build_app, build_job_registry, HttpSettings};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    /// Server URL without a database name
    server_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=300"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;

        Ok(Self {
            server_url: format!("postgresql://postgres:postgres@{}:{}", pg_host, pg_port),
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }

    fn url_for(&self, database: &str) -> String {
        format!("{}/{}", self.server_url, database)
    }
}

/// Per-test database plus helpers to build the app and a job runner.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let deps = ctx.deps(&TestDependencies::new());
///     let app = ctx.app(deps.clone());
/// }
/// ```
pub struct TestHarness {
    /// Database pool - use this for fixtures and assertions.
    pub db_pool: PgPool,
    database: String,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
        let infra = SharedTestInfra::get().await;
        if let Ok(admin) = PgPool::connect(&infra.url_for("postgres")).await {
            let _ = sqlx::query(&format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                self.database
            ))
            .execute(&admin)
            .await;
            admin.close().await;
        }
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let database = format!("course_test_{}", Uuid::new_v4().simple());

        let admin = PgPool::connect(&infra.url_for("postgres"))
            .await
            .context("Failed to connect to admin database")?;
        sqlx::query(&format!("CREATE DATABASE \"{}\"", database))
            .execute(&admin)
            .await
            .context("Failed to create test database")?;
        admin.close().await;

        let db_pool = PgPool::connect(&infra.url_for(&database))
            .await
            .context("Failed to connect to test database")?;
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self { db_pool, database })
    }

    /// Server dependencies backed by this test's database and the given mocks.
    pub fn deps(&self, test_deps: &TestDependencies) -> Arc<ServerDeps> {
        test_deps.into_server_deps(self.db_pool.clone())
    }

    /// Router without API key checks.
    pub fn app(&self, deps: Arc<ServerDeps>) -> Router {
        build_app(deps, &HttpSettings::default())
    }

    pub fn app_with_api_key(&self, deps: Arc<ServerDeps>, api_key: &str) -> Router {
        build_app(
            deps,
            &HttpSettings {
                api_key: Some(api_key.to_string()),
                cors_origins: Vec::new(),
            },
        )
    }

    /// Job runner over the production registry. Drive it with
    /// `process_available()`.
    pub fn runner(&self, deps: Arc<ServerDeps>) -> JobRunner {
        JobRunner::with_config(
            build_job_registry(),
            deps,
            JobRunnerConfig::with_worker_id(format!("test-worker-{}", Uuid::new_v4())),
        )
    }
}
