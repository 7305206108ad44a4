//! Job registry for deserializing and executing jobs.
//!
//! The registry maps job type strings (e.g., "generate_course") to handlers
//! that reconstruct the typed job from its JSON args and run it. The runner
//! claims rows from the database and dispatches them here without knowing
//! the concrete types.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::job::Job;
use super::queue::CommandMeta;
use crate::common::JobId;
use crate::kernel::ServerDeps;

/// Everything a handler gets besides its own arguments.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: JobId,
    pub deps: Arc<ServerDeps>,
    pub cancel: CancellationToken,
}

type BoxedHandler = Box<
    dyn Fn(serde_json::Value, JobContext) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// Registry that maps job type strings to handlers.
///
/// ```ignore
/// let mut registry = JobRegistry::new();
/// registry.register::<GenerateCourseJob, _, _>(GenerateCourseJob::JOB_TYPE, |job, ctx| async move {
///     generate_course(job, ctx).await
/// });
/// ```
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job type with its handler.
    pub fn register<J, F, Fut>(&mut self, job_type: &'static str, handler: F)
    where
        J: CommandMeta + DeserializeOwned + Send + 'static,
        F: Fn(J, JobContext) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: BoxedHandler = Box::new(move |value, ctx| {
            let handler = handler.clone();
            Box::pin(async move {
                let job: J = serde_json::from_value(value)
                    .map_err(|e| anyhow!("Failed to deserialize {}: {}", job_type, e))?;
                handler(job, ctx).await
            })
        });

        self.handlers.insert(job_type, boxed);
    }

    /// Execute a claimed job using its registered handler.
    pub async fn execute(&self, job: &Job, ctx: JobContext) -> Result<()> {
        let handler = self
            .handlers
            .get(job.job_type.as_str())
            .ok_or_else(|| anyhow!("Unknown job type: {}", job.job_type))?;

        handler(job.args.clone(), ctx).await
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

pub type SharedJobRegistry = Arc<JobRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct EchoJob {
        text: String,
    }

    impl CommandMeta for EchoJob {
        fn command_type(&self) -> &'static str {
            "echo"
        }
    }

    #[test]
    fn register_and_check() {
        let mut registry = JobRegistry::new();
        registry.register::<EchoJob, _, _>("echo", |_job, _ctx| async move { Ok(()) });

        assert!(registry.is_registered("echo"));
        assert!(!registry.is_registered("unknown"));
        assert_eq!(registry.registered_types(), vec!["echo"]);
    }
}
