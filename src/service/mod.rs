//! Resource operations over the store: validation, nested relations, uploads, messages.

mod messages;
mod relations;
mod resources;
mod uploads;
mod validation;
pub use messages::Messages;
pub use relations::RelationWriter;
pub use resources::ResourceService;
pub use uploads::{FileField, UploadMapper, UploadedFiles};
pub use validation::RequestValidator;
