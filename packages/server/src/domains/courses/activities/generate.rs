//! Course generation pipeline: outline, lessons, quizzes and resources.
//!
//! Each module and each lesson (with its quizzes and resources) is committed
//! in its own short transaction; model and network calls run outside them.
//! A canceled or failed run keeps whatever it committed so far. Before every
//! write the course row is re-read and the run stops if the course was
//! canceled, deleted or handed to a newer job.

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use thiserror::Error;
use tracing::{debug, info};

use super::discovery::discover_lesson_resources;
use super::lesson_content::generate_lesson_markdown;
use super::outline::build_outline;
use super::quiz::generate_lesson_quiz;
use crate::common::{CourseId, JobId};
use crate::domains::courses::models::{
    truncate_chars, Course, CourseModule, CourseStatus, Lesson, Quiz, Resource,
};
use crate::kernel::ServerDeps;

const LESSON_TITLE_MAX_CHARS: usize = 255;

/// The course was canceled, deleted or superseded while this run was active.
#[derive(Debug, Clone, Copy, Error)]
#[error("course generation canceled")]
pub struct GenerationCanceled;

/// Counts of what a finished run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub modules: usize,
    pub lessons: usize,
    pub resources: usize,
    pub quizzes: usize,
}

/// Fail with [`GenerationCanceled`] unless the course still exists, is not
/// canceled and still belongs to `job_id`.
pub async fn ensure_not_canceled(
    course_id: CourseId,
    job_id: JobId,
    executor: impl PgExecutor<'_>,
) -> Result<()> {
    match Course::generation_state(course_id, executor).await? {
        Some((status, current)) if status != CourseStatus::Canceled && current == Some(job_id) => {
            Ok(())
        }
        _ => Err(GenerationCanceled.into()),
    }
}

/// Worker picked the job up. Returns false when the course is missing,
/// canceled or owned by another job.
pub async fn mark_started(
    course_id: CourseId,
    job_id: JobId,
    executor: impl PgExecutor<'_>,
) -> Result<bool> {
    Course::mark_generating(course_id, job_id, executor).await
}

/// Record a failure unless the course was canceled meanwhile.
pub async fn mark_failed(
    course_id: CourseId,
    job_id: JobId,
    error: &str,
    executor: impl PgExecutor<'_>,
) -> Result<bool> {
    Course::mark_failed(course_id, job_id, error, executor).await
}

/// Generate and store the full content of a course, then mark it `ready`.
///
/// The caller has already marked the course `generating` for `job_id`.
pub async fn persist(
    deps: &ServerDeps,
    course_id: CourseId,
    job_id: JobId,
    title: &str,
) -> Result<GenerationSummary> {
    let pool = &deps.db_pool;
    let outline = build_outline(deps.ai.as_ref(), title).await;
    debug!(course_id = %course_id, modules = outline.len(), "outline ready");

    ensure_not_canceled(course_id, job_id, pool).await?;
    let offset = CourseModule::max_position(course_id, pool).await?;
    let mut summary = GenerationSummary::default();

    for (module_index, outline_module) in outline.iter().enumerate() {
        let mut tx = pool.begin().await.context("failed to open module transaction")?;
        ensure_not_canceled(course_id, job_id, &mut *tx).await?;
        let module = CourseModule::create(
            course_id,
            &outline_module.title,
            None,
            offset + module_index as i32 + 1,
            &mut *tx,
        )
        .await?;
        tx.commit().await.context("failed to commit module")?;
        summary.modules += 1;

        for (lesson_index, lesson_title) in outline_module.lessons.iter().enumerate() {
            ensure_not_canceled(course_id, job_id, pool).await?;
            let lesson_title = truncate_chars(lesson_title, LESSON_TITLE_MAX_CHARS);

            let content = generate_lesson_markdown(deps.ai.as_ref(), title, &lesson_title).await;
            let questions = if deps.generate_quizzes {
                generate_lesson_quiz(deps.ai.as_ref(), title, &lesson_title, &content).await
            } else {
                Vec::new()
            };
            let resources = discover_lesson_resources(
                deps.fetcher.as_ref(),
                &deps.discovery,
                &lesson_title,
                title,
            )
            .await;

            let mut tx = pool.begin().await.context("failed to open lesson transaction")?;
            ensure_not_canceled(course_id, job_id, &mut *tx).await?;
            let lesson = Lesson::create(
                module.id,
                &lesson_title,
                &content,
                lesson_index as i32 + 1,
                &mut *tx,
            )
            .await?;

            for question in &questions {
                Quiz::create(
                    lesson.id,
                    &question.question,
                    &question.options,
                    &question.answer,
                    &mut *tx,
                )
                .await?;
            }

            let mut inserted_resources = 0;
            for resource in &resources {
                let inserted = Resource::insert_ignore_duplicate(
                    lesson.id,
                    &resource.url,
                    &resource.title,
                    &resource.provider,
                    &mut *tx,
                )
                .await?;
                if inserted {
                    inserted_resources += 1;
                }
            }
            tx.commit().await.context("failed to commit lesson")?;

            summary.lessons += 1;
            summary.quizzes += questions.len();
            summary.resources += inserted_resources;
        }
    }

    ensure_not_canceled(course_id, job_id, pool).await?;
    if !Course::mark_ready(course_id, job_id, pool).await? {
        return Err(GenerationCanceled.into());
    }

    info!(
        course_id = %course_id,
        modules = summary.modules,
        lessons = summary.lessons,
        resources = summary.resources,
        quizzes = summary.quizzes,
        "course generated"
    );
    Ok(summary)
}
