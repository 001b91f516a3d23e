//! Process settings read from the environment (after `dotenvy::dotenv()`).

use std::path::PathBuf;

pub const DEFAULT_UPLOAD_RELATIVE_PATH: &str = "uploads/";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub resources_config: PathBuf,
    pub bind_addr: String,
    pub storage_root: PathBuf,
    /// Upload directory under `storage_root` for resources that set none.
    pub upload_relative_path: String,
    pub views_dir: PathBuf,
    pub lang_dir: PathBuf,
    pub locale: String,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/resource_controller".into(),
            resources_config: PathBuf::from("resources.json"),
            bind_addr: "0.0.0.0:3000".into(),
            storage_root: PathBuf::from("storage/app"),
            upload_relative_path: DEFAULT_UPLOAD_RELATIVE_PATH.into(),
            views_dir: PathBuf::from("views"),
            lang_dir: PathBuf::from("lang"),
            locale: "en".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or unparsable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Settings::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);
        Settings {
            database_url: lookup("DATABASE_URL").unwrap_or(d.database_url),
            resources_config: path("RESOURCES_CONFIG", d.resources_config),
            bind_addr: lookup("BIND_ADDR").unwrap_or(d.bind_addr),
            storage_root: path("STORAGE_ROOT", d.storage_root),
            upload_relative_path: lookup("UPLOAD_RELATIVE_PATH").unwrap_or(d.upload_relative_path),
            views_dir: path("VIEWS_DIR", d.views_dir),
            lang_dir: path("LANG_DIR", d.lang_dir),
            locale: lookup("APP_LOCALE").unwrap_or(d.locale),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.max_upload_bytes),
        }
    }
}
