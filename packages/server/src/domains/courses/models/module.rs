use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use crate::common::{CourseId, ModuleId};

/// An ordered section of a course.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CourseModule {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub summary: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl CourseModule {
    pub async fn create(
        course_id: CourseId,
        title: &str,
        summary: Option<&str>,
        position: i32,
        executor: impl PgExecutor<'_>,
    ) -> Result<CourseModule> {
        let module = sqlx::query_as::<_, CourseModule>(
            "INSERT INTO course_modules (id, course_id, title, summary, position) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING *",
        )
        .bind(ModuleId::new())
        .bind(course_id)
        .bind(title)
        .bind(summary)
        .bind(position)
        .fetch_one(executor)
        .await?;
        Ok(module)
    }

    /// Highest position used by the course's modules (0 when it has none).
    pub async fn max_position(course_id: CourseId, executor: impl PgExecutor<'_>) -> Result<i32> {
        let (max,): (Option<i32>,) =
            sqlx::query_as("SELECT MAX(position) FROM course_modules WHERE course_id = $1")
                .bind(course_id)
                .fetch_one(executor)
                .await?;
        Ok(max.unwrap_or(0))
    }

    pub async fn find_by_course(course_id: CourseId, pool: &PgPool) -> Result<Vec<CourseModule>> {
        let modules = sqlx::query_as::<_, CourseModule>(
            "SELECT * FROM course_modules WHERE course_id = $1 ORDER BY position, id",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;
        Ok(modules)
    }

    /// Remove every module of a course (lessons and their children cascade).
    pub async fn delete_by_course(course_id: CourseId, executor: impl PgExecutor<'_>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM course_modules WHERE course_id = $1")
            .bind(course_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
