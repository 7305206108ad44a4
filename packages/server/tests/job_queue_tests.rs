//! Postgres job queue and runner behaviour, independent of the course domain.

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use course_builder::common::JobId;
use course_builder::kernel::jobs::{
    CommandMeta, EnqueueResult, JobRegistry, JobRunner, JobRunnerConfig, JobStatus, NewJob,
};
use course_builder::kernel::TestDependencies;
use serde::{Deserialize, Serialize};
use serde_json::json;
use test_context::test_context;

use crate::common::TestHarness;

#[derive(Debug, Serialize, Deserialize)]
struct Echo {
    outcome: String,
}

impl CommandMeta for Echo {
    fn command_type(&self) -> &'static str {
        "echo"
    }
}

fn echo_registry() -> Arc<JobRegistry> {
    let mut registry = JobRegistry::new();
    registry.register::<Echo, _, _>("echo", |job, _ctx| async move {
        match job.outcome.as_str() {
            "ok" => Ok(()),
            "hang" => {
                std::future::pending::<()>().await;
                Ok(())
            }
            other => bail!("echo failed: {other}"),
        }
    });
    Arc::new(registry)
}

fn new_job(job_type: &str, key: Option<&str>) -> NewJob {
    NewJob {
        id: JobId::new(),
        job_type: job_type.to_string(),
        args: json!({ "outcome": "ok" }),
        reference_id: None,
        idempotency_key: key.map(String::from),
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn idempotency_key_returns_active_job(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let queue = &deps.job_queue;

    let first = queue.enqueue(new_job("echo", Some("k1"))).await.unwrap();
    assert!(first.is_created());

    let second = queue.enqueue(new_job("echo", Some("k1"))).await.unwrap();
    assert!(matches!(second, EnqueueResult::Duplicate(id) if id == first.job_id()));

    // Once the first job is gone the key is free again
    assert!(queue.cancel(first.job_id()).await.unwrap());
    let third = queue.enqueue(new_job("echo", Some("k1"))).await.unwrap();
    assert!(third.is_created());
    assert_ne!(third.job_id(), first.job_id());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn claim_hands_each_job_out_once(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let queue = &deps.job_queue;

    let a = queue.enqueue(new_job("echo", None)).await.unwrap().job_id();
    let b = queue.enqueue(new_job("echo", None)).await.unwrap().job_id();

    let claimed = queue.claim("worker-1", 10).await.unwrap();
    assert_eq!(claimed.len(), 2);
    assert!(claimed.iter().all(|j| j.status == JobStatus::Running));
    assert!(claimed.iter().all(|j| j.worker_id.as_deref() == Some("worker-1")));
    assert!(queue.claim("worker-2", 10).await.unwrap().is_empty());

    // Only pending jobs can be cancelled
    assert!(!queue.cancel(a).await.unwrap());

    queue.mark_succeeded(a).await.unwrap();
    queue.mark_failed(b, "boom").await.unwrap();

    let a = queue.find_by_id(a).await.unwrap().unwrap();
    assert_eq!(a.status, JobStatus::Succeeded);
    assert!(a.finished_at.is_some());

    let b = queue.find_by_id(b).await.unwrap().unwrap();
    assert_eq!(b.status, JobStatus::Failed);
    assert_eq!(b.error_message.as_deref(), Some("boom"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn runner_records_each_outcome(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let queue = deps.job_queue.clone();

    let ok = queue
        .enqueue_command(&Echo { outcome: "ok".into() })
        .await
        .unwrap()
        .job_id();
    let failing = queue
        .enqueue_command(&Echo { outcome: "nope".into() })
        .await
        .unwrap()
        .job_id();
    let unknown = queue.enqueue(new_job("mystery", None)).await.unwrap().job_id();

    let config = JobRunnerConfig {
        batch_size: 10,
        ..JobRunnerConfig::with_worker_id("outcomes")
    };
    let runner = JobRunner::with_config(echo_registry(), deps.clone(), config);
    assert_eq!(runner.process_available().await.unwrap(), 3);

    let status = |id: JobId| {
        let queue = queue.clone();
        async move { queue.find_by_id(id).await.unwrap().unwrap() }
    };

    assert_eq!(status(ok).await.status, JobStatus::Succeeded);

    let failed = status(failing).await;
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.unwrap().contains("echo failed: nope"));

    let unknown = status(unknown).await;
    assert_eq!(unknown.status, JobStatus::Failed);
    assert!(unknown.error_message.unwrap().contains("Unknown job type"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn cancellation_token_stops_running_job(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let job_id = deps
        .job_queue
        .enqueue_command(&Echo { outcome: "hang".into() })
        .await
        .unwrap()
        .job_id();

    let runner = JobRunner::with_config(
        echo_registry(),
        deps.clone(),
        JobRunnerConfig::with_worker_id("hanging"),
    );
    let worker = tokio::spawn(async move { runner.process_available().await });

    let mut cancelled = false;
    for _ in 0..100 {
        if deps.job_cancellations.cancel(job_id) {
            cancelled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cancelled, "job never registered a cancellation token");

    assert_eq!(worker.await.unwrap().unwrap(), 1);
    let job = deps.job_queue.find_by_id(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(!deps.job_cancellations.is_running(job_id));
}
