// HTTP routes
pub mod courses;
pub mod health;

pub use courses::*;
pub use health::*;
