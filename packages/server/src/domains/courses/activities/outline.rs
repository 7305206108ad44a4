//! Course outline generation.
//!
//! The LLM is asked for a JSON skeleton of modules and lesson titles. Any
//! failure (call error, bad JSON, nothing usable) falls back to a fixed
//! four-module outline so generation can always proceed.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::kernel::BaseAI;

const OUTLINE_SYSTEM_PROMPT: &str = "You create clean JSON outlines for courses.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineModule {
    pub title: String,
    pub lessons: Vec<String>,
}

fn outline_prompt(title: &str) -> String {
    format!(
        "Create a 4-module outline for a course titled '{title}'. \
         Each module should have 3 lessons. Return ONLY JSON with this schema:\n\
         {{ \"modules\": [ {{ \"title\": str, \"lessons\": [str, str, str] }}, ... ] }}\n\
         No markdown, no commentary."
    )
}

/// Ask the LLM for an outline, falling back to [`fallback_outline`].
pub async fn build_outline(ai: &dyn BaseAI, title: &str) -> Vec<OutlineModule> {
    let parsed = match ai.complete_json(OUTLINE_SYSTEM_PROMPT, &outline_prompt(title)).await {
        Ok(raw) => parse_outline(&raw),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(modules) => modules,
        Err(e) => {
            warn!(course_title = %title, error = %e, "outline generation failed, falling back");
            fallback_outline()
        }
    }
}

/// Parse and clean an outline answer.
///
/// Modules without a title or without any non-empty lesson are dropped; an
/// answer with no surviving modules is an error.
pub fn parse_outline(raw: &str) -> Result<Vec<OutlineModule>> {
    let data: Value =
        serde_json::from_str(strip_code_fences(raw)).context("outline is not valid JSON")?;

    let modules = data
        .get("modules")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let cleaned: Vec<OutlineModule> = modules
        .iter()
        .filter_map(|module| {
            let title = scalar_text(module.get("title")?)?;
            let lessons: Vec<String> = module
                .get("lessons")
                .and_then(Value::as_array)
                .map(|lessons| lessons.iter().filter_map(scalar_text).collect())
                .unwrap_or_default();

            (!title.is_empty() && !lessons.is_empty()).then_some(OutlineModule { title, lessons })
        })
        .collect();

    if cleaned.is_empty() {
        bail!("outline has no usable modules");
    }
    Ok(cleaned)
}

/// Trimmed text of a JSON scalar; `None` for blanks, nulls and containers.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Remove a surrounding ```json ... ``` fence if the model added one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn fallback_outline() -> Vec<OutlineModule> {
    let module = |title: &str, lessons: [&str; 3]| OutlineModule {
        title: title.to_string(),
        lessons: lessons.iter().map(|l| l.to_string()).collect(),
    };

    vec![
        module("Introduction", ["Course Overview", "Key Concepts", "Environment Setup"]),
        module("Core Skills", ["Basics", "Working with Data", "Common Patterns"]),
        module("Applied Topics", ["Case Study 1", "Case Study 2", "Best Practices"]),
        module("Wrap Up", ["Project", "Next Steps", "Resources"]),
    ]
}
