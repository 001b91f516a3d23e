//! Request extractors shared by the resource handlers.

pub mod context;
pub mod payload;
pub use context::RequestContext;
pub use payload::ResourcePayload;
