//! Localization catalog: flat `key -> template` maps loaded per locale.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Catalog namespace; keys are looked up as `resource-controller.{key}`.
pub const NAMESPACE: &str = "resource-controller";

#[derive(Clone, Debug, Default)]
pub struct Translator {
    locale: String,
    lines: HashMap<String, String>,
}

impl Translator {
    pub fn new(locale: impl Into<String>, lines: HashMap<String, String>) -> Self {
        let lines = lines
            .into_iter()
            .map(|(k, v)| (format!("{}.{}", NAMESPACE, k), v))
            .collect();
        Translator {
            locale: locale.into(),
            lines,
        }
    }

    /// Read `{dir}/{locale}/resource-controller.json`. A missing file yields an empty catalog,
    /// so every message falls back to its built-in English text.
    pub async fn load(dir: impl AsRef<Path>, locale: &str) -> Result<Self, ConfigError> {
        let path = dir
            .as_ref()
            .join(locale)
            .join(format!("{}.json", NAMESPACE));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no message catalog; using fallbacks");
                return Ok(Translator {
                    locale: locale.to_string(),
                    lines: HashMap::new(),
                });
            }
            Err(e) => return Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
        };
        let lines: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        tracing::info!(locale, entries = lines.len(), "loaded message catalog");
        Ok(Translator::new(locale, lines))
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn has(&self, key: &str) -> bool {
        self.lines.contains_key(key)
    }

    /// Template for `key` with `:name` placeholders replaced. Unknown keys come back verbatim.
    pub fn trans(&self, key: &str, replace: &[(&str, &str)]) -> String {
        let Some(template) = self.lines.get(key) else {
            return key.to_string();
        };
        // Longest names first so `:numberx` is not clobbered by `:number`.
        let mut pairs: Vec<&(&str, &str)> = replace.iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let mut out = template.clone();
        for (name, value) in pairs {
            out = out.replace(&format!(":{}", name), value);
        }
        out
    }
}
