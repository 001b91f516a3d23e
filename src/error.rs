//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required resource property is missing; carries the rendered message.
    #[error("{message}")]
    PropertyNotSet { property: &'static str, message: String },
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("invalid relation {resource}.{relation}: {reason}")]
    InvalidRelation {
        resource: String,
        relation: String,
        reason: String,
    },
    #[error("config load: {0}")]
    Load(String),
}

/// Field errors collected by the request validator, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: String) {
        self.0.entry(field.to_string()).or_default().push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flat: Vec<&str> = self.0.values().flatten().map(String::as_str).collect();
        f.write_str(&flat.join(" "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(ValidationErrors),
    /// Array-valued request data not named after a declared relation.
    #[error("{message}")]
    UnknownRelation { name: String, message: String },
    /// Request file not named after an upload column or relation.
    #[error("{message}")]
    UnknownUploadTarget { name: String, message: String },
    #[error("{message}")]
    Upload { field: String, message: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The record is in a state the operation cannot apply to; the text is user-facing.
    #[error("{0}")]
    Refused(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("{0}")]
    ViewNotFound(String),
    #[error("view: {0}")]
    View(String),
    /// A mutation failed and was rolled back; `message` is the user-facing text.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnknownRelation { .. }
            | AppError::UnknownUploadTarget { .. }
            | AppError::Upload { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::Refused(_) => StatusCode::CONFLICT,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Db(_)
            | AppError::Storage(_)
            | AppError::ViewNotFound(_)
            | AppError::View(_)
            | AppError::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors raised by request content rather than by the system; these keep their own
    /// message instead of being wrapped into a templated failure.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::UnknownRelation { .. } => "unknown_relation",
            AppError::UnknownUploadTarget { .. } => "unknown_upload_target",
            AppError::Upload { .. } => "upload_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::Refused(_) => "operation_refused",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::Storage(_) => "storage_error",
            AppError::ViewNotFound(_) | AppError::View(_) => "view_error",
            AppError::Failed { .. } => "operation_failed",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Plain JSON mapping used outside resource controllers (health routes, extractor rejections).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
