use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

use crate::common::{LessonId, ResourceId};

/// A curated external link attached to a lesson. Unique per (lesson, url).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Resource {
    pub id: ResourceId,
    pub lesson_id: LessonId,
    pub url: String,
    pub title: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Insert unless the lesson already has this URL. Returns whether a row
    /// was written.
    pub async fn insert_ignore_duplicate(
        lesson_id: LessonId,
        url: &str,
        title: &str,
        provider: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO resources (id, lesson_id, url, title, provider) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (lesson_id, url) DO NOTHING",
        )
        .bind(ResourceId::new())
        .bind(lesson_id)
        .bind(url)
        .bind(title)
        .bind(provider)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_lessons(lesson_ids: &[LessonId], pool: &PgPool) -> Result<Vec<Resource>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let resources = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources WHERE lesson_id = ANY($1) ORDER BY id",
        )
        .bind(lesson_ids)
        .fetch_all(pool)
        .await?;
        Ok(resources)
    }
}
