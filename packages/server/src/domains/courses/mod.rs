//! Courses domain: course trees, their generation pipeline and exports.

pub mod activities;
pub mod data;
pub mod jobs;
pub mod models;
