use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::common::{LessonId, QuizId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Quiz {
    pub id: QuizId,
    pub lesson_id: LessonId,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub answer: String,
    pub is_multiple_choice: bool,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub async fn create(
        lesson_id: LessonId,
        question: &str,
        options: &[String],
        answer: &str,
        executor: impl PgExecutor<'_>,
    ) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "INSERT INTO quizzes (id, lesson_id, question, options, answer, is_multiple_choice) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING *",
        )
        .bind(QuizId::new())
        .bind(lesson_id)
        .bind(question)
        .bind(Json(options))
        .bind(answer)
        .bind(options.len() > 1)
        .fetch_one(executor)
        .await?;
        Ok(quiz)
    }

    pub async fn find_by_lessons(lesson_ids: &[LessonId], pool: &PgPool) -> Result<Vec<Quiz>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let quizzes = sqlx::query_as::<_, Quiz>(
            "SELECT * FROM quizzes WHERE lesson_id = ANY($1) ORDER BY id",
        )
        .bind(lesson_ids)
        .fetch_all(pool)
        .await?;
        Ok(quizzes)
    }
}
