//! Route assembly.

mod common;
mod resource;
pub use common::common_routes;
pub use resource::{resource_router, resource_routes};

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Common routes plus every routed resource under the state's base path, with request tracing
/// and the upload size limit applied.
pub fn app(state: AppState) -> Router {
    let max_body = state.settings.max_upload_bytes;
    let resources = resource_routes(state.clone());
    let resources = if state.base_path.is_empty() {
        resources
    } else {
        Router::new().nest(&state.base_path, resources)
    };
    Router::new()
        .merge(common_routes(state))
        .merge(resources)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
}
