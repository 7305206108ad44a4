use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{CourseId, JobId, LessonId, ModuleId, QuizId, ResourceId};
use crate::domains::courses::activities::tree::{CourseTree, LessonTree, ModuleTree};
use crate::domains::courses::models::{Course, CourseStatus, Quiz, Resource};

pub const TITLE_MAX_CHARS: usize = 160;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Body of `POST /courses`.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A validated `CourseCreate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
}

impl CourseCreate {
    /// Trim the title and enforce the column limits.
    pub fn validate(self) -> Result<NewCourse, String> {
        let title = self.title.trim().to_string();
        let title_len = title.chars().count();
        if title_len == 0 {
            return Err("title must not be empty".to_string());
        }
        if title_len > TITLE_MAX_CHARS {
            return Err(format!("title must be at most {TITLE_MAX_CHARS} characters"));
        }

        let description = self.description.unwrap_or_default();
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(format!(
                "description must be at most {DESCRIPTION_MAX_CHARS} characters"
            ));
        }

        Ok(NewCourse { title, description })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceOut {
    pub id: ResourceId,
    pub lesson_id: LessonId,
    pub url: String,
    pub title: String,
    pub provider: String,
}

impl From<Resource> for ResourceOut {
    fn from(resource: Resource) -> Self {
        Self {
            id: resource.id,
            lesson_id: resource.lesson_id,
            url: resource.url,
            title: resource.title,
            provider: resource.provider,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizOut {
    pub id: QuizId,
    pub lesson_id: LessonId,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl From<Quiz> for QuizOut {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            lesson_id: quiz.lesson_id,
            question: quiz.question,
            options: quiz.options.0,
            answer: quiz.answer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonOut {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub position: i32,
    pub content_md: String,
    pub resources: Vec<ResourceOut>,
    pub quizzes: Vec<QuizOut>,
}

impl From<LessonTree> for LessonOut {
    fn from(tree: LessonTree) -> Self {
        Self {
            id: tree.lesson.id,
            module_id: tree.lesson.module_id,
            title: tree.lesson.title,
            position: tree.lesson.position,
            content_md: tree.lesson.content_md,
            resources: tree.resources.into_iter().map(Into::into).collect(),
            quizzes: tree.quizzes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleOut {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub summary: Option<String>,
    pub position: i32,
    pub lessons: Vec<LessonOut>,
}

impl From<ModuleTree> for ModuleOut {
    fn from(tree: ModuleTree) -> Self {
        Self {
            id: tree.module.id,
            course_id: tree.module.course_id,
            title: tree.module.title,
            summary: tree.module.summary,
            position: tree.module.position,
            lessons: tree.lessons.into_iter().map(Into::into).collect(),
        }
    }
}

/// Full course tree returned by create and detail routes.
#[derive(Debug, Clone, Serialize)]
pub struct CourseOut {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub job_id: Option<JobId>,
    pub last_error: Option<String>,
    pub modules: Vec<ModuleOut>,
}

impl From<CourseTree> for CourseOut {
    fn from(tree: CourseTree) -> Self {
        let course = tree.course;
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            status: course.status,
            created_at: course.created_at,
            job_id: course.job_id,
            last_error: course.last_error,
            modules: tree.modules.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseListItem {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<Course> for CourseListItem {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            status: course.status,
            created_at: course.created_at,
            job_id: course.job_id,
            last_error: course.last_error,
        }
    }
}

/// Body of the status, regenerate, cancel and by-job routes.
#[derive(Debug, Clone, Serialize)]
pub struct CourseStatusOut {
    pub id: CourseId,
    pub status: CourseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl From<Course> for CourseStatusOut {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            status: course.status,
            last_error: course.last_error,
            job_id: course.job_id,
        }
    }
}
