//! Background jobs for the courses domain.

mod executor;
mod generate_course;

pub use executor::{execute_generate_course_job, register_course_jobs};
pub use generate_course::GenerateCourseJob;
