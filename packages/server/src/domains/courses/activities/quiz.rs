//! Optional multiple-choice quiz per lesson.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::kernel::BaseAI;

pub const MAX_QUESTIONS: usize = 3;

const QUIZ_SYSTEM_PROMPT: &str = "You write short multiple-choice quizzes as JSON.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Deserialize)]
struct RawQuiz {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    answer: String,
}

fn quiz_prompt(course_title: &str, lesson_title: &str, content: &str) -> String {
    format!(
        "Write up to {MAX_QUESTIONS} multiple-choice questions for the lesson '{lesson_title}' \
         in the course '{course_title}'. Each question has 3-4 options and exactly one answer, \
         which must be copied verbatim from the options. Return ONLY JSON:\n\
         {{ \"questions\": [ {{ \"question\": str, \"options\": [str, ...], \"answer\": str }} ] }}\n\n\
         Lesson notes:\n{content}"
    )
}

/// Quiz questions for a lesson; any failure yields none.
pub async fn generate_lesson_quiz(
    ai: &dyn BaseAI,
    course_title: &str,
    lesson_title: &str,
    content: &str,
) -> Vec<QuizQuestion> {
    let result = match ai
        .complete_json(QUIZ_SYSTEM_PROMPT, &quiz_prompt(course_title, lesson_title, content))
        .await
    {
        Ok(raw) => parse_quiz(&raw),
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        warn!(lesson_title = %lesson_title, error = %e, "quiz generation failed");
        Vec::new()
    })
}

/// Keep well-formed questions: non-empty text, at least two options, and an
/// answer that is one of the options.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>> {
    let quiz: RawQuiz = serde_json::from_str(raw.trim()).context("quiz is not valid JSON")?;

    Ok(quiz
        .questions
        .into_iter()
        .filter_map(|q| {
            let question = q.question.trim().to_string();
            let options: Vec<String> = q
                .options
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            let answer = q.answer.trim().to_string();

            let valid = !question.is_empty() && options.len() >= 2 && options.contains(&answer);
            valid.then_some(QuizQuestion {
                question,
                options,
                answer,
            })
        })
        .take(MAX_QUESTIONS)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MockAI;

    #[test]
    fn drops_malformed_questions() {
        let raw = r#"{"questions": [
            {"question": "2 + 2?", "options": ["3", "4"], "answer": "4"},
            {"question": "", "options": ["a", "b"], "answer": "a"},
            {"question": "Only one", "options": ["a"], "answer": "a"},
            {"question": "Wrong answer", "options": ["a", "b"], "answer": "c"}
        ]}"#;

        let quiz = parse_quiz(raw).unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].answer, "4");
    }

    #[test]
    fn caps_question_count() {
        let question = r#"{"question": "q", "options": ["a", "b"], "answer": "a"}"#;
        let raw = format!("{{\"questions\": [{0},{0},{0},{0},{0}]}}", question);
        assert_eq!(parse_quiz(&raw).unwrap().len(), MAX_QUESTIONS);
    }

    #[tokio::test]
    async fn failure_yields_no_questions() {
        let ai = MockAI::new().with_default("no json here");
        assert!(generate_lesson_quiz(&ai, "c", "l", "notes").await.is_empty());
    }
}
