//! Markdown and ZIP renderings of a course tree.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::tree::{CourseTree, LessonTree};
use crate::domains::courses::models::{Quiz, Resource};

lazy_static! {
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Lowercase ASCII slug, `fallback` when nothing survives.
pub fn slugify(s: &str, fallback: &str) -> String {
    let lowered = s.to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug.to_string()
    }
}

/// Download name without extension: the requested name, else the title slug.
pub fn export_base_name(tree: &CourseTree, filename: Option<&str>) -> String {
    match filename.map(str::trim).filter(|f| !f.is_empty()) {
        Some(name) => name.to_string(),
        None => slugify(&tree.course.title, &format!("course-{}", tree.course.id)),
    }
}

fn push_resources(lines: &mut Vec<String>, resources: &[Resource]) {
    lines.push("**Resources**".to_string());
    for resource in resources {
        let title = if resource.title.is_empty() {
            &resource.url
        } else {
            &resource.title
        };
        lines.push(format!("- [{}]({})", title, resource.url));
    }
}

fn push_quiz(lines: &mut Vec<String>, quizzes: &[Quiz]) {
    lines.push("**Quiz**".to_string());
    for (qi, quiz) in quizzes.iter().enumerate() {
        lines.push(format!("- Q{}. {}", qi + 1, quiz.question));
        for (oi, option) in quiz.options.iter().enumerate() {
            lines.push(format!("  - {}. {}", oi + 1, option));
        }
        if !quiz.answer.is_empty() {
            lines.push(format!("  - **Answer:** {}", quiz.answer));
        }
    }
}

fn finish(lines: Vec<String>) -> String {
    format!("{}\n", lines.join("\n").trim())
}

/// The whole course as one Markdown document.
pub fn course_to_markdown(tree: &CourseTree) -> String {
    let course = &tree.course;
    let mut lines = vec![format!("# {}", course.title)];

    if !course.description.is_empty() {
        lines.push(String::new());
        lines.push(course.description.clone());
    }

    lines.push(String::new());
    lines.push("----".to_string());
    lines.push(String::new());
    lines.push("**Metadata**".to_string());
    lines.push(String::new());
    lines.push(format!("- Status: `{}`", course.status));
    if let Some(job_id) = course.job_id {
        lines.push(format!("- Job ID: `{job_id}`"));
    }
    lines.push(format!("- Created: `{}`", course.created_at.to_rfc3339()));

    for (mi, module) in tree.modules.iter().enumerate() {
        let mi = mi + 1;
        lines.push(String::new());
        lines.push(format!("## Module {mi}: {}", module.module.title));
        if let Some(summary) = module.module.summary.as_deref().filter(|s| !s.is_empty()) {
            lines.push(String::new());
            lines.push(summary.to_string());
        }

        for (li, lesson) in module.lessons.iter().enumerate() {
            lines.push(String::new());
            lines.push(format!("### Lesson {mi}.{}: {}", li + 1, lesson.lesson.title));
            lines.push(String::new());
            let content = lesson.lesson.content_md.trim();
            if content.is_empty() {
                lines.push("_No content available yet._".to_string());
            } else {
                lines.push(content.to_string());
            }

            if !lesson.resources.is_empty() {
                lines.push(String::new());
                push_resources(&mut lines, &lesson.resources);
            }
            if !lesson.quizzes.is_empty() {
                lines.push(String::new());
                push_quiz(&mut lines, &lesson.quizzes);
            }
        }
    }

    finish(lines)
}

/// A single lesson file for the ZIP export.
pub fn lesson_to_markdown(lesson: &LessonTree) -> String {
    let mut lines = vec![format!("# {}\n", lesson.lesson.title)];

    let content = lesson.lesson.content_md.trim();
    if !content.is_empty() {
        lines.push(content.to_string());
        lines.push(String::new());
    }
    if !lesson.resources.is_empty() {
        push_resources(&mut lines, &lesson.resources);
        lines.push(String::new());
    }
    if !lesson.quizzes.is_empty() {
        push_quiz(&mut lines, &lesson.quizzes);
        lines.push(String::new());
    }

    finish(lines)
}

/// Archive path of each lesson file, in course order.
pub fn lesson_paths(tree: &CourseTree) -> Vec<(String, &LessonTree)> {
    let mut paths = Vec::with_capacity(tree.lesson_count());
    for (mi, module) in tree.modules.iter().enumerate() {
        let mi = mi + 1;
        let module_dir = format!(
            "Module {mi} - {}",
            slugify(&module.module.title, &format!("module-{mi}"))
        );
        for (li, lesson) in module.lessons.iter().enumerate() {
            let li = li + 1;
            let name = format!(
                "Lesson {mi}.{li} - {}.md",
                slugify(&lesson.lesson.title, &format!("lesson-{mi}-{li}"))
            );
            paths.push((format!("{module_dir}/{name}"), lesson));
        }
    }
    paths
}

/// README.md with the full course plus one Markdown file per lesson.
pub fn course_to_zip(tree: &CourseTree) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("README.md", options)
        .context("failed to start README.md")?;
    zip.write_all(course_to_markdown(tree).as_bytes())?;

    for (path, lesson) in lesson_paths(tree) {
        zip.start_file(path.as_str(), options)
            .with_context(|| format!("failed to start {path}"))?;
        zip.write_all(lesson_to_markdown(lesson).as_bytes())?;
    }

    let cursor = zip.finish().context("failed to finish course archive")?;
    Ok(cursor.into_inner())
}
