//! HTTP handlers for the resource controller actions.

pub mod resource;
pub use resource::*;
