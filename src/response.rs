//! Response documents for JSON clients: the action envelope and the paginator.

use crate::store::Record;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// `{ code, message, errors, redirect }` returned by mutating actions and JSON failures.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: String,
    pub message: String,
    /// `[]` when empty, `{ field: [messages] }` for validation failures.
    pub errors: Value,
    pub redirect: String,
}

pub fn envelope(status: StatusCode, message: impl Into<String>, errors: Value, redirect: &str) -> Response {
    let body = Envelope {
        code: status.as_u16().to_string(),
        message: message.into(),
        errors,
        redirect: redirect.to_string(),
    };
    (status, Json(body)).into_response()
}

pub fn success_json(message: impl Into<String>, redirect: &str) -> Response {
    envelope(StatusCode::OK, message, Value::Array(Vec::new()), redirect)
}

pub fn not_found_json(redirect: &str) -> Response {
    envelope(StatusCode::NOT_FOUND, "Not found", Value::Array(Vec::new()), redirect)
}

pub fn unprocessable_json(errors: Value, redirect: &str) -> Response {
    envelope(StatusCode::UNPROCESSABLE_ENTITY, "Unprocessable Entity", errors, redirect)
}

#[derive(Debug, Serialize)]
pub struct Paginator {
    pub current_page: u32,
    pub data: Vec<Record>,
    pub from: Option<u64>,
    pub last_page: u64,
    pub per_page: u32,
    pub to: Option<u64>,
    pub total: u64,
}

impl Paginator {
    pub fn new(data: Vec<Record>, total: u64, current_page: u32, per_page: u32) -> Self {
        let offset = u64::from(current_page.saturating_sub(1)) * u64::from(per_page);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + data.len() as u64))
        };
        Paginator {
            current_page,
            data,
            from,
            last_page: total.div_ceil(u64::from(per_page.max(1))).max(1),
            per_page,
            to,
            total,
        }
    }
}
