//! HTML views: the renderer seam and the handlebars implementation.

use crate::error::AppError;
use handlebars::Handlebars;
use serde_json::Value;
use std::path::Path;

pub trait ViewRenderer: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn render(&self, name: &str, data: &Value) -> Result<String, AppError>;
}

/// Templates named by their path under the views directory without extension,
/// e.g. `admin/users/index.hbs` is `admin/users/index`.
pub struct HandlebarsViews {
    registry: Handlebars<'static>,
}

impl Default for HandlebarsViews {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsViews {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        HandlebarsViews { registry }
    }

    /// Load every `.hbs` file under `dir`. A missing directory leaves the registry empty.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref();
        let mut views = Self::new();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "views directory not found; HTML actions will fail");
            return Ok(views);
        }
        views.load_dir(dir, dir)?;
        tracing::info!(dir = %dir.display(), templates = views.registry.get_templates().len(), "loaded views");
        Ok(views)
    }

    fn load_dir(&mut self, root: &Path, dir: &Path) -> Result<(), AppError> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.load_dir(root, &path)?;
                continue;
            }
            if path.extension().map_or(true, |ext| ext != "hbs") {
                continue;
            }
            let name = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            let source = std::fs::read_to_string(&path)?;
            self.register(&name, &source)?;
        }
        Ok(())
    }

    pub fn register(&mut self, name: &str, source: &str) -> Result<(), AppError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| AppError::View(format!("{}: {}", name, e)))
    }
}

impl ViewRenderer for HandlebarsViews {
    fn exists(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    fn render(&self, name: &str, data: &Value) -> Result<String, AppError> {
        self.registry
            .render(name, data)
            .map_err(|e| AppError::View(format!("{}: {}", name, e)))
    }
}
