//! Job handlers for the courses domain.

use anyhow::Result;
use tracing::{error, info, warn};

use super::GenerateCourseJob;
use crate::domains::courses::activities::generate::{
    ensure_not_canceled, mark_failed, mark_started, persist, GenerationCanceled,
};
use crate::domains::courses::models::Course;
use crate::kernel::jobs::{JobCancelled, JobContext, JobRegistry};

/// Register every course job type with the runner's registry.
pub fn register_course_jobs(registry: &mut JobRegistry) {
    registry.register::<GenerateCourseJob, _, _>(GenerateCourseJob::JOB_TYPE, |job, ctx| async move {
        execute_generate_course_job(job, ctx).await
    });
}

/// Run one generation attempt.
///
/// Cancellation finishes the job as cancelled without touching the course;
/// any other error marks the course `failed` and fails the job.
pub async fn execute_generate_course_job(job: GenerateCourseJob, ctx: JobContext) -> Result<()> {
    let pool = &ctx.deps.db_pool;
    let course_id = job.course_id;
    let job_id = ctx.job_id;

    if Course::find_by_id(course_id, pool).await?.is_none() {
        warn!(course_id = %course_id, job_id = %job_id, "course no longer exists, skipping generation");
        return Ok(());
    }

    let result = match generate(&job, &ctx).await {
        // A write racing a delete or cancel fails with a storage error.
        Err(e) if e.downcast_ref::<GenerationCanceled>().is_none() => {
            match ensure_not_canceled(course_id, job_id, pool).await {
                Err(check) if check.downcast_ref::<GenerationCanceled>().is_some() => Err(check),
                _ => Err(e),
            }
        }
        other => other,
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.downcast_ref::<GenerationCanceled>().is_some() => {
            info!(course_id = %course_id, job_id = %job_id, "course generation canceled");
            Err(JobCancelled.into())
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(course_id = %course_id, job_id = %job_id, error = %message, "course generation failed");
            if let Err(mark_err) = mark_failed(course_id, job_id, &message, pool).await {
                warn!(course_id = %course_id, error = %mark_err, "failed to record generation failure");
            }
            Err(e)
        }
    }
}

async fn generate(job: &GenerateCourseJob, ctx: &JobContext) -> Result<()> {
    let pool = &ctx.deps.db_pool;
    let course_id = job.course_id;
    let job_id = ctx.job_id;

    ensure_not_canceled(course_id, job_id, pool).await?;
    if !mark_started(course_id, job_id, pool).await? {
        return Err(GenerationCanceled.into());
    }
    info!(course_id = %course_id, job_id = %job_id, "Starting generate course job");

    persist(&ctx.deps, course_id, job_id, &job.title).await?;
    Ok(())
}
