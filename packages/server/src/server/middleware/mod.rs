// HTTP middleware
pub mod api_key;
pub mod request_id;

pub use api_key::*;
pub use request_id::*;
