//! Server dependencies for jobs and route handlers (using traits for testability)
//!
//! This module provides the central dependency container. All external
//! services sit behind trait objects so tests can swap in mocks.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::DiscoveryConfig;
use crate::kernel::jobs::{JobCancellations, JobQueue};
use crate::kernel::{BaseAI, BaseFetcher};

/// Server dependencies accessible to jobs and handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// LLM used for outlines, lesson notes and quizzes
    pub ai: Arc<dyn BaseAI>,
    /// HTTP GET for resource discovery
    pub fetcher: Arc<dyn BaseFetcher>,
    pub job_queue: Arc<dyn JobQueue>,
    /// Tokens of jobs running in this process
    pub job_cancellations: JobCancellations,
    pub discovery: DiscoveryConfig,
    pub generate_quizzes: bool,
}

impl ServerDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        ai: Arc<dyn BaseAI>,
        fetcher: Arc<dyn BaseFetcher>,
        job_queue: Arc<dyn JobQueue>,
        job_cancellations: JobCancellations,
        discovery: DiscoveryConfig,
        generate_quizzes: bool,
    ) -> Self {
        Self {
            db_pool,
            ai,
            fetcher,
            job_queue,
            job_cancellations,
            discovery,
            generate_quizzes,
        }
    }
}
