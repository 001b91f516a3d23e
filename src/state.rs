//! Shared application state for all routes.

use crate::config::{ResolvedModel, ResolvedResource};
use crate::lang::Translator;
use crate::settings::Settings;
use crate::storage::FileStorage;
use crate::store::Store;
use crate::views::ViewRenderer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ResolvedModel>,
    pub views: Arc<dyn ViewRenderer>,
    pub storage: Arc<dyn FileStorage>,
    pub lang: Arc<Translator>,
    pub settings: Arc<Settings>,
    /// Path the resource routes are nested under; prefixes redirect targets.
    pub base_path: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        model: ResolvedModel,
        views: Arc<dyn ViewRenderer>,
        storage: Arc<dyn FileStorage>,
        lang: Translator,
        settings: Settings,
    ) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            views,
            storage,
            lang: Arc::new(lang),
            settings: Arc::new(settings),
            base_path: String::new(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of a resource's index action, the redirect target after mutations.
    pub fn index_url(&self, resource: &ResolvedResource) -> String {
        format!("{}/{}", self.base_path, resource.name)
    }
}

/// State of one mounted resource router.
#[derive(Clone)]
pub struct ResourceState {
    pub app: AppState,
    pub resource: Arc<ResolvedResource>,
}
