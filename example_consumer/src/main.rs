//! Example consumer: a separate Rust project that uses resource-controller as a dependency.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`
//!
//! Tables named in `RESOURCES_CONFIG` must already exist in `DATABASE_URL`.

use resource_controller::{
    app, ensure_database_exists, load_from_path, resolve, AppState, FileStorage, HandlebarsViews,
    LocalStorage, PgStore, Settings, Translator,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resource_controller=info")),
        )
        .init();

    let settings = Settings::from_env();
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    let store = PgStore::new(pool);
    tracing::info!(connections = store.pool().size(), "database pool ready");

    let lang = Translator::load(&settings.lang_dir, &settings.locale).await?;
    let config = load_from_path(&settings.resources_config).await?;
    let model = resolve(&config, &lang)?;
    let views = HandlebarsViews::from_dir(&settings.views_dir)?;
    let storage = LocalStorage::new(&settings.storage_root);
    tracing::info!(root = %storage.root().display(), "uploads stored on local disk");
    let bind_addr = settings.bind_addr.clone();

    let state = AppState::new(
        Arc::new(store),
        model,
        Arc::new(views),
        Arc::new(storage),
        lang,
        settings,
    );

    let listener = TcpListener::bind(&bind_addr).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on port {}", port);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
