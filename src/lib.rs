//! Resource controller: configuration-driven CRUD actions over relational resources, with
//! nested relation writes, file uploads, HTML views and JSON envelopes.

pub mod config;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod handlers;
pub mod lang;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod storage;
pub mod store;
pub mod views;

pub use config::{load_from_path, load_from_str, resolve, FullConfig, ResolvedModel, ResolvedResource};
pub use error::{AppError, ConfigError, ValidationErrors};
pub use lang::Translator;
pub use response::{Envelope, Paginator};
pub use routes::{app, common_routes, resource_router, resource_routes};
pub use service::ResourceService;
pub use settings::Settings;
pub use state::{AppState, ResourceState};
pub use storage::{FileStorage, LocalStorage, UploadedFile};
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store, Transaction};
pub use views::{HandlebarsViews, ViewRenderer};
