//! GenerateCourseJob - background job that builds a course's content.
//!
//! Routes enqueue this job and return immediately; the course's `job_id`
//! names the job so status polling and cancellation can find it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::CourseId;
use crate::kernel::jobs::CommandMeta;

/// Job to generate the outline, lessons and resources of a course.
///
/// # Usage
///
/// ```ignore
/// let job = GenerateCourseJob::new(course.id, &course.title);
/// deps.job_queue.enqueue_command_as(job_id, &job).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateCourseJob {
    pub course_id: CourseId,
    pub title: String,
}

impl GenerateCourseJob {
    /// The job type identifier used in the jobs table.
    pub const JOB_TYPE: &'static str = "generate_course";

    pub fn new(course_id: CourseId, title: impl Into<String>) -> Self {
        Self {
            course_id,
            title: title.into(),
        }
    }
}

impl CommandMeta for GenerateCourseJob {
    fn command_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    fn reference_id(&self) -> Option<Uuid> {
        Some(self.course_id.into_uuid())
    }
}
