use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, PgExecutor, PgPool, QueryBuilder, Type};

use crate::common::{CourseId, JobId, OffsetPage};

pub const LAST_ERROR_MAX_CHARS: usize = 500;

/// Generation status of a course.
///
/// `queued → generating → ready | failed`, with `canceled` reachable from
/// any state and never overwritten by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Queued,
    Generating,
    Ready,
    Failed,
    Canceled,
}

impl CourseStatus {
    pub const ALL: [CourseStatus; 5] = [
        CourseStatus::Queued,
        CourseStatus::Generating,
        CourseStatus::Ready,
        CourseStatus::Failed,
        CourseStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Queued => "queued",
            CourseStatus::Generating => "generating",
            CourseStatus::Ready => "ready",
            CourseStatus::Failed => "failed",
            CourseStatus::Canceled => "canceled",
        }
    }

    /// A generation job is queued or running for the course.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, CourseStatus::Queued | CourseStatus::Generating)
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        CourseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid course status: {}", s))
    }
}

impl Type<Postgres> for CourseStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl Encode<'_, Postgres> for CourseStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

impl Decode<'_, Postgres> for CourseStatus {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        raw.parse::<CourseStatus>().map_err(Into::into)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub status: CourseStatus,
    pub job_id: Option<JobId>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for the course listing.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub statuses: Vec<CourseStatus>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl CourseFilter {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut has_where = false;
        if !self.statuses.is_empty() {
            builder.push(" WHERE status = ANY(");
            builder.push_bind(
                self.statuses
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect::<Vec<_>>(),
            );
            builder.push(")");
            has_where = true;
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(if has_where { " AND " } else { " WHERE " });
            let pattern = format!("%{}%", escape_like(search));
            builder.push("(title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl Course {
    pub async fn create(
        title: &str,
        description: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            "INSERT INTO courses (id, title, description, status) \
             VALUES ($1, $2, $3, 'queued') \
             RETURNING *",
        )
        .bind(CourseId::new())
        .bind(title)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(course)
    }

    pub async fn find_by_id(id: CourseId, executor: impl PgExecutor<'_>) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(course)
    }

    pub async fn find_by_job_id(job_id: JobId, executor: impl PgExecutor<'_>) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE job_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(executor)
        .await?;
        Ok(course)
    }

    /// Page of courses, newest first.
    pub async fn list(filter: &CourseFilter, page: OffsetPage, pool: &PgPool) -> Result<Vec<Course>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM courses");
        filter.push_where(&mut builder);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let courses = builder.build_query_as::<Course>().fetch_all(pool).await?;
        Ok(courses)
    }

    pub async fn count(filter: &CourseFilter, pool: &PgPool) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses");
        filter.push_where(&mut builder);

        let (count,): (i64,) = builder.build_query_as().fetch_one(pool).await?;
        Ok(count)
    }

    /// Point the course at a new generation job and put it back in the queue.
    pub async fn requeue(
        id: CourseId,
        job_id: JobId,
        clear_error: bool,
        executor: impl PgExecutor<'_>,
    ) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            "UPDATE courses SET status = 'queued', job_id = $2, \
                 last_error = CASE WHEN $3 THEN NULL ELSE last_error END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(job_id)
        .bind(clear_error)
        .fetch_one(executor)
        .await?;
        Ok(course)
    }

    /// Status and current job, for the generator's cooperative checks.
    pub async fn generation_state(
        id: CourseId,
        executor: impl PgExecutor<'_>,
    ) -> Result<Option<(CourseStatus, Option<JobId>)>> {
        let row = sqlx::query_as::<_, (CourseStatus, Option<JobId>)>(
            "SELECT status, job_id FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Worker picked up `job_id`: `generating`, error cleared.
    ///
    /// No-op (returns false) when the course is canceled or now belongs to
    /// another job.
    pub async fn mark_generating(
        id: CourseId,
        job_id: JobId,
        executor: impl PgExecutor<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE courses SET status = 'generating', last_error = NULL, job_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status <> 'canceled' AND job_id = $2",
        )
        .bind(id)
        .bind(job_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_ready(
        id: CourseId,
        job_id: JobId,
        executor: impl PgExecutor<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE courses SET status = 'ready', updated_at = NOW() \
             WHERE id = $1 AND status <> 'canceled' AND job_id = $2",
        )
        .bind(id)
        .bind(job_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_failed(
        id: CourseId,
        job_id: JobId,
        error: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE courses SET status = 'failed', last_error = $3, updated_at = NOW() \
             WHERE id = $1 AND status <> 'canceled' AND job_id = $2",
        )
        .bind(id)
        .bind(job_id)
        .bind(truncate_chars(error, LAST_ERROR_MAX_CHARS))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_canceled(
        id: CourseId,
        reason: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            "UPDATE courses SET status = 'canceled', last_error = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(truncate_chars(reason, LAST_ERROR_MAX_CHARS))
        .fetch_one(executor)
        .await?;
        Ok(course)
    }

    /// Delete the course; modules, lessons, resources and quizzes cascade.
    pub async fn delete(id: CourseId, executor: impl PgExecutor<'_>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
