//! Resource routes built from the resolved model: one nested router per routed resource.

use crate::handlers::resource::{create, destroy, edit, index, patch, show, spoofed, store, update};
use crate::state::{AppState, ResourceState};
use axum::{routing::get, Router};
use std::sync::Arc;

/// Routes of one resource, relative to its mount point.
pub fn resource_router(state: ResourceState) -> Router {
    Router::new()
        .route("/", get(index).post(store))
        .route("/create", get(create))
        .route(
            "/:key",
            get(show)
                .put(update)
                .patch(patch)
                .delete(destroy)
                .post(spoofed),
        )
        .route("/:key/edit", get(edit))
        .with_state(state)
}

/// Every resource with `routes` enabled, mounted at `/{name}`.
pub fn resource_routes(state: AppState) -> Router {
    let mut router = Router::new();
    for resource in state.model.resources.iter().filter(|r| r.routes) {
        tracing::debug!(resource = %resource.name, route = %resource.route_name("index"), "mounting resource routes");
        let resource_state = ResourceState {
            app: state.clone(),
            resource: Arc::new(resource.clone()),
        };
        router = router.nest(&format!("/{}", resource.name), resource_router(resource_state));
    }
    router
}
