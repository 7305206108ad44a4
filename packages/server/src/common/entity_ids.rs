//! Typed ID definitions for all persisted entities.

pub use super::id::Id;

/// Marker type for Course entities.
pub struct Course;

/// Marker type for CourseModule entities (ordered sections of a course).
pub struct CourseModule;

/// Marker type for Lesson entities.
pub struct Lesson;

/// Marker type for Resource entities (curated external links).
pub struct Resource;

/// Marker type for Quiz entities.
pub struct Quiz;

/// Marker type for background job records.
pub struct BackgroundJob;

pub type CourseId = Id<Course>;
pub type ModuleId = Id<CourseModule>;
pub type LessonId = Id<Lesson>;
pub type ResourceId = Id<Resource>;
pub type QuizId = Id<Quiz>;
pub type JobId = Id<BackgroundJob>;
