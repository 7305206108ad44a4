// AI Course Builder - API Core
//
// Accepts a course title, generates an outline, lesson notes, curated
// resources and optional quizzes in a background job, and serves the result
// over a small REST API with markdown/zip export.
//
// Generation runs on a Postgres-backed job queue (kernel/jobs) so the API
// process and standalone workers share one source of truth.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;
pub mod telemetry;

pub use config::*;
