// Business domains
pub mod courses;
