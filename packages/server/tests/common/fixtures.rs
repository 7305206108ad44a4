//! Canned LLM answers and search pages.

use axum::Router;
use course_builder::kernel::{MockAI, MockFetcher};
use serde_json::{json, Value};

use super::http::post_json;

/// Substring of the outline prompt.
pub const OUTLINE_NEEDLE: &str = "4-module outline";
/// Substring of the lesson notes prompt.
pub const LESSON_NEEDLE: &str = "Markdown notes for the lesson";
/// Substring of the quiz prompt.
pub const QUIZ_NEEDLE: &str = "multiple-choice questions";

pub const LESSON_MARKDOWN: &str = "- Point one\n- Point two\n\nTips: practice daily.";

/// Outline JSON with two modules of two lessons each.
pub fn small_outline() -> String {
    json!({
        "modules": [
            { "title": "Foundations", "lessons": ["Ownership", "Borrowing"] },
            { "title": "Practice", "lessons": ["Lifetimes", "Traits"] }
        ]
    })
    .to_string()
}

pub fn quiz_answer() -> String {
    json!({
        "questions": [
            { "question": "Which keyword moves?", "options": ["let", "move"], "answer": "move" },
            { "question": "Dropped?", "options": ["only one"], "answer": "only one" }
        ]
    })
    .to_string()
}

/// MockAI that answers outline, lesson and quiz prompts.
pub fn course_ai() -> MockAI {
    MockAI::new()
        .with_response(QUIZ_NEEDLE, &quiz_answer())
        .with_response(OUTLINE_NEEDLE, &small_outline())
        .with_response(LESSON_NEEDLE, LESSON_MARKDOWN)
}

/// Search pages that yield two web links and one video for every lesson.
pub fn search_pages() -> MockFetcher {
    MockFetcher::new()
        .with_page(
            "http://wiki.test",
            r#"["q", ["Rust"], [""], ["https://en.wikipedia.org/wiki/Rust_(programming_language)"]]"#,
        )
        .with_page(
            "http://brave.test",
            r#"<a href="https://doc.rust-lang.org/book/?utm_source=brave">Book</a>
               <a href="https://search.brave.com/help">help</a>
               <a href="https://en.wikipedia.org/wiki/Rust_(programming_language)">dup</a>"#,
        )
        .with_page("http://youtube.test", r#""/watch?v=rustvid01""#)
}

/// Create a course through the API and return the response body.
pub async fn create_course(app: &Router, title: &str) -> Value {
    let response = post_json(app, "/courses", &json!({ "title": title })).await;
    assert_eq!(response.status, 201, "create failed: {}", response.text());
    response.json()
}
