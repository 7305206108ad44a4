//! Loading a course with everything under it.

use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgPool;

use crate::common::{CourseId, LessonId, ModuleId};
use crate::domains::courses::models::{Course, CourseModule, Lesson, Quiz, Resource};

#[derive(Debug, Clone)]
pub struct LessonTree {
    pub lesson: Lesson,
    pub resources: Vec<Resource>,
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone)]
pub struct ModuleTree {
    pub module: CourseModule,
    pub lessons: Vec<LessonTree>,
}

/// A course with its modules and lessons in position order, and each
/// lesson's resources and quizzes in insertion order.
#[derive(Debug, Clone)]
pub struct CourseTree {
    pub course: Course,
    pub modules: Vec<ModuleTree>,
}

impl CourseTree {
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

pub async fn load_course_tree(id: CourseId, pool: &PgPool) -> Result<Option<CourseTree>> {
    let Some(course) = Course::find_by_id(id, pool).await? else {
        return Ok(None);
    };

    let modules = CourseModule::find_by_course(id, pool).await?;
    let module_ids: Vec<ModuleId> = modules.iter().map(|m| m.id).collect();
    let lessons = Lesson::find_by_modules(&module_ids, pool).await?;
    let lesson_ids: Vec<LessonId> = lessons.iter().map(|l| l.id).collect();

    let mut resources_by_lesson: HashMap<LessonId, Vec<Resource>> = HashMap::new();
    for resource in Resource::find_by_lessons(&lesson_ids, pool).await? {
        resources_by_lesson.entry(resource.lesson_id).or_default().push(resource);
    }

    let mut quizzes_by_lesson: HashMap<LessonId, Vec<Quiz>> = HashMap::new();
    for quiz in Quiz::find_by_lessons(&lesson_ids, pool).await? {
        quizzes_by_lesson.entry(quiz.lesson_id).or_default().push(quiz);
    }

    let mut lessons_by_module: HashMap<ModuleId, Vec<LessonTree>> = HashMap::new();
    for lesson in lessons {
        let resources = resources_by_lesson.remove(&lesson.id).unwrap_or_default();
        let quizzes = quizzes_by_lesson.remove(&lesson.id).unwrap_or_default();
        lessons_by_module
            .entry(lesson.module_id)
            .or_default()
            .push(LessonTree {
                lesson,
                resources,
                quizzes,
            });
    }

    let modules = modules
        .into_iter()
        .map(|module| ModuleTree {
            lessons: lessons_by_module.remove(&module.id).unwrap_or_default(),
            module,
        })
        .collect();

    Ok(Some(CourseTree { course, modules }))
}
