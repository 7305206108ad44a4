pub mod course;
pub mod params;

pub use course::{
    CourseCreate, CourseListItem, CourseOut, CourseStatusOut, LessonOut, ModuleOut, NewCourse,
    QuizOut, ResourceOut,
};
pub use params::{ExportFormat, ExportParams, ListCoursesParams, RegenerateParams};
