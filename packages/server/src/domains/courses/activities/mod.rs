//! Course generation activities and renderers.
//!
//! Activities take infrastructure traits (`BaseAI`, `BaseFetcher`) and the
//! database pool; they hold the business rules for what to ask the model,
//! where to look for resources and how results are stored.

pub mod discovery;
pub mod export;
pub mod generate;
pub mod lesson_content;
pub mod normalize;
pub mod outline;
pub mod quiz;
pub mod tree;

pub use discovery::{discover_lesson_resources, search_web, search_youtube};
pub use export::{course_to_markdown, course_to_zip, export_base_name, slugify};
pub use generate::{
    ensure_not_canceled, mark_failed, mark_started, persist, GenerationCanceled, GenerationSummary,
};
pub use normalize::{normalize_resources, ResourceCandidate};
pub use outline::{build_outline, OutlineModule};
pub use tree::{load_course_tree, CourseTree, LessonTree, ModuleTree};
