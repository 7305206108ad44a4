use tracing::warn;

use crate::domains::courses::models::truncate_chars;
use crate::kernel::BaseAI;

pub const LESSON_MAX_CHARS: usize = 4000;

const LESSON_SYSTEM_PROMPT: &str = "You write concise, accurate course notes in Markdown. \
     Keep it practical. NEVER include code unless the topic is explicitly about software/programming.";

fn lesson_prompt(course_title: &str, lesson_title: &str) -> String {
    format!(
        "Create brief Markdown notes for the lesson **{lesson_title}** in the course **{course_title}**.\n\
         - 6-10 bullet points or short sub-sections\n\
         - If and only if this lesson is about programming/software, include ONE tiny code block; \
         otherwise include NO code\n\
         - End with a short 'Tips' or 'Next steps' line"
    )
}

/// Markdown notes for one lesson. An LLM failure yields an empty string so
/// the lesson is still created.
pub async fn generate_lesson_markdown(
    ai: &dyn BaseAI,
    course_title: &str,
    lesson_title: &str,
) -> String {
    match ai
        .complete(LESSON_SYSTEM_PROMPT, &lesson_prompt(course_title, lesson_title))
        .await
    {
        Ok(markdown) => truncate_chars(markdown.trim(), LESSON_MAX_CHARS),
        Err(e) => {
            warn!(
                course_title = %course_title,
                lesson_title = %lesson_title,
                error = %e,
                "lesson content generation failed"
            );
            String::new()
        }
    }
}
