pub mod course;
pub mod lesson;
pub mod module;
pub mod quiz;
pub mod resource;

pub use course::{truncate_chars, Course, CourseFilter, CourseStatus};
pub use lesson::Lesson;
pub use module::CourseModule;
pub use quiz::Quiz;
pub use resource::Resource;
