//! HTTP handlers for resource requests.

pub mod resource;
pub use resource::*;
