use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use crate::common::{LessonId, ModuleId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub content_md: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl Lesson {
    pub async fn create(
        module_id: ModuleId,
        title: &str,
        content_md: &str,
        position: i32,
        executor: impl PgExecutor<'_>,
    ) -> Result<Lesson> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "INSERT INTO lessons (id, module_id, title, content_md, position) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING *",
        )
        .bind(LessonId::new())
        .bind(module_id)
        .bind(title)
        .bind(content_md)
        .bind(position)
        .fetch_one(executor)
        .await?;
        Ok(lesson)
    }

    /// Lessons of the given modules, ordered by position within each module.
    pub async fn find_by_modules(module_ids: &[ModuleId], pool: &PgPool) -> Result<Vec<Lesson>> {
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE module_id = ANY($1) ORDER BY module_id, position, id",
        )
        .bind(module_ids)
        .fetch_all(pool)
        .await?;
        Ok(lessons)
    }
}
