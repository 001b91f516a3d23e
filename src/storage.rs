//! File storage for uploads: the storage seam, the local filesystem backend and the
//! uploaded-file value handed over by the request extractor.

use crate::error::AppError;
use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// One file part of a multipart request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Form field name as sent, e.g. `hasManyFileUploads[3]`.
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
    /// Set when the part could not be read completely.
    pub error: Option<String>,
}

impl UploadedFile {
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && !self.data.is_empty()
    }

    /// Extension of the client file name, else the first one registered for the content type.
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|n| Path::new(n).extension())
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty());
        from_name.or_else(|| {
            self.content_type
                .as_deref()
                .and_then(mime_guess::get_mime_extensions_str)
                .and_then(|exts| exts.first())
                .map(|e| e.to_string())
        })
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Directory that storage keys are relative to.
    fn root(&self) -> &Path;

    /// Store `data` at `key`, relative to the root; parent directories are created.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), AppError>;
}

#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        LocalStorage {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::BadRequest(format!("invalid storage key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    fn root(&self) -> &Path {
        &self.base_path
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), AppError> {
        let path = self.full_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &data).await?;
        tracing::debug!(key = %key, path = ?path, size = data.len(), "stored file");
        Ok(())
    }
}
