//! Submitted resource data from JSON, urlencoded or multipart bodies.
//!
//! Form field names use bracket nesting: `related[a]=1` becomes `{"related": {"a": "1"}}` and
//! `tags[]=1&tags[]=2` becomes `{"tags": ["1", "2"]}`. File parts are kept apart from the
//! fields and grouped by their top-level name.

use crate::error::AppError;
use crate::service::{FileField, UploadedFiles};
use crate::storage::UploadedFile;
use crate::store::Record;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use serde_json::{Map, Value};

/// Form field carrying the spoofed HTTP method.
pub const METHOD_FIELD: &str = "_method";
const TOKEN_FIELD: &str = "_token";

#[derive(Clone, Debug, Default)]
pub struct ResourcePayload {
    pub fields: Record,
    pub files: UploadedFiles,
    /// Uppercased `_method` value, when one was sent.
    pub method: Option<String>,
}

impl ResourcePayload {
    fn from_fields(mut fields: Record, files: UploadedFiles) -> Self {
        let method = match fields.remove(METHOD_FIELD) {
            Some(Value::String(m)) => Some(m.trim().to_ascii_uppercase()).filter(|m| !m.is_empty()),
            _ => None,
        };
        fields.remove(TOKEN_FIELD);
        ResourcePayload { fields, files, method }
    }

    /// Build fields from `name=value` pairs with bracket nesting.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut root = Value::Object(Map::new());
        for (name, value) in pairs {
            insert_path(&mut root, &split_name(name), Value::String(value.to_string()));
        }
        Self::from_fields(into_record(root), UploadedFiles::new())
    }
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// `a[b][]` -> `["a", "b", ""]`. Names without a leading key are taken whole.
fn split_name(name: &str) -> Vec<String> {
    let open = match name.find('[') {
        Some(i) if i > 0 => i,
        _ => return vec![name.to_string()],
    };
    let mut parts = vec![name[..open].to_string()];
    let mut rest = &name[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(']') {
            Some(end) => {
                parts.push(inner[..end].to_string());
                rest = &inner[end + 1..];
            }
            None => break,
        }
    }
    parts
}

fn insert_path(slot: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *slot = value;
        return;
    };

    if head.is_empty() {
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => {
                let mut child = Value::Null;
                insert_path(&mut child, rest, value);
                items.push(child);
            }
            Value::Object(map) => {
                let key = map.len().to_string();
                let child = map.entry(key).or_insert(Value::Null);
                insert_path(child, rest, value);
            }
            other => {
                *other = Value::Array(Vec::new());
                insert_path(other, path, value);
            }
        }
        return;
    }

    if !slot.is_object() {
        // an explicit key turns a pushed list into an index-keyed object
        let map = match std::mem::take(slot) {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Map::new(),
        };
        *slot = Value::Object(map);
    }
    if let Value::Object(map) = slot {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        insert_path(child, rest, value);
    }
}

fn add_file(files: &mut UploadedFiles, file: UploadedFile) {
    let mut path = split_name(&file.field).into_iter();
    let root = path.next().unwrap_or_default();
    let index = path.next();
    match (files.remove(&root), index) {
        (None, None) => {
            files.insert(root, FileField::Single(file));
        }
        (None, Some(key)) => {
            files.insert(root, FileField::Many(vec![(Some(key).filter(|k| !k.is_empty()), file)]));
        }
        (Some(FileField::Single(previous)), key) => {
            let items = vec![(None, previous), (key.filter(|k| !k.is_empty()), file)];
            files.insert(root, FileField::Many(items));
        }
        (Some(FileField::Many(mut items)), key) => {
            items.push((key.filter(|k| !k.is_empty()), file));
            files.insert(root, FileField::Many(items));
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ResourcePayload, AppError> {
    let mut root = Value::Object(Map::new());
    let mut files = UploadedFiles::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = match field.name() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };
        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            insert_path(&mut root, &split_name(&name), Value::String(text));
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let (data, error) = match field.bytes().await {
            Ok(data) => (data, None),
            Err(e) => (Bytes::new(), Some(e.body_text())),
        };
        // an untouched file input is sent as an empty part without a name
        if file_name.is_empty() && data.is_empty() && error.is_none() {
            continue;
        }
        let broken = error.is_some();
        add_file(
            &mut files,
            UploadedFile {
                field: name,
                file_name: Some(file_name).filter(|n| !n.is_empty()),
                content_type,
                data,
                error,
            },
        );
        if broken {
            break;
        }
    }
    Ok(ResourcePayload::from_fields(into_record(root), files))
}

#[async_trait]
impl<S> FromRequest<S> for ResourcePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Self::from_pairs(
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            ));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(Self::from_fields(map, UploadedFiles::new())),
            Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
            Err(e) => Err(AppError::BadRequest(format!("invalid JSON body: {}", e))),
        }
    }
}
