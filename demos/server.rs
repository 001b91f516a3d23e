//! Demo server: resources from `demos/resources.json`, views from `demos/views`, data in memory.
//!
//! `cargo run --example server`, then open http://127.0.0.1:3000/posts/create

use resource_controller::{
    app, load_from_path, resolve, AppState, FileStorage, HandlebarsViews, LocalStorage, MemoryStore,
    Settings, Translator,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("resource_controller=debug".parse()?))
        .init();

    let mut settings = Settings::from_env();
    if std::env::var("RESOURCES_CONFIG").is_err() {
        settings.resources_config = "demos/resources.json".into();
    }
    if std::env::var("VIEWS_DIR").is_err() {
        settings.views_dir = "demos/views".into();
    }

    let lang = Translator::load(&settings.lang_dir, &settings.locale).await?;
    let config = load_from_path(&settings.resources_config).await?;
    let model = resolve(&config, &lang)?;
    let views = HandlebarsViews::from_dir(&settings.views_dir)?;
    let storage = LocalStorage::new(&settings.storage_root);
    tracing::info!(root = %storage.root().display(), "uploads stored on local disk");
    let bind_addr = settings.bind_addr.clone();

    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        model,
        Arc::new(views),
        Arc::new(storage),
        lang,
        settings,
    );

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
