//! Shared fixtures: a `users` resource with every relation kind, backed by the memory store,
//! in-memory templates and a temporary upload directory.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use resource_controller::{
    app, load_from_str, resolve, store::Record, AppState, HandlebarsViews, LocalStorage, MemoryStore,
    ResolvedModel, Settings, Store, Translator,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "resource-controller-test-boundary";

pub fn resources_json(with_trashed: bool) -> Value {
    json!({
        "resources": [
            {
                "name": "users",
                "table": "users",
                "soft_delete_column": "deleted_at",
                "with_trashed": with_trashed,
                "columns": [
                    "name", "email", "password", "avatar",
                    { "name": "related_id", "type": "bigint" },
                    { "name": "upload_id", "type": "bigint" },
                    { "name": "created_at", "type": "timestamptz", "has_default": true },
                    { "name": "updated_at", "type": "timestamptz", "has_default": true }
                ],
                "validation": {
                    "name": { "required": true, "min_length": 2 },
                    "email": { "required": true, "format": "email" }
                },
                "messages": { "email.format": ":attribute must be a valid address" },
                "uploads": { "columns": ["avatar"], "location_column": "location" },
                "relations": [
                    { "name": "hasOneRelated", "kind": "has_one", "related": "related", "foreign_key": "user_id" },
                    { "name": "morphOneRelated", "kind": "morph_one", "related": "related", "morph_name": "relatable" },
                    { "name": "belongsToRelated", "kind": "belongs_to", "related": "related", "foreign_key": "related_id" },
                    { "name": "hasManyRelated", "kind": "has_many", "related": "related", "foreign_key": "user_id" },
                    { "name": "morphManyRelated", "kind": "morph_many", "related": "related", "morph_name": "relatable" },
                    { "name": "belongsToManyRelated", "kind": "belongs_to_many", "related": "related",
                      "pivot": "related_user", "foreign_pivot_key": "user_id", "related_pivot_key": "related_id" },
                    { "name": "morphToManyRelated", "kind": "morph_to_many", "related": "related",
                      "morph_name": "relatable", "pivot": "relatables", "related_pivot_key": "related_id" },
                    { "name": "hasManyFileUploads", "kind": "has_many", "related": "uploads", "foreign_key": "user_id" },
                    { "name": "belongsToFileUpload", "kind": "belongs_to", "related": "uploads", "foreign_key": "upload_id" },
                    { "name": "hasOneFileUpload", "kind": "has_one", "related": "uploads", "foreign_key": "user_id" },
                    { "name": "belongsToManyFileUploads", "kind": "belongs_to_many", "related": "uploads",
                      "pivot": "upload_user", "foreign_pivot_key": "user_id", "related_pivot_key": "upload_id" }
                ]
            },
            {
                "name": "related",
                "table": "related",
                "routes": false,
                "columns": [
                    "a", "b", "c",
                    { "name": "user_id", "type": "bigint" },
                    { "name": "relatable_id", "type": "bigint" },
                    "relatable_type"
                ]
            },
            {
                "name": "uploads",
                "table": "uploads",
                "routes": false,
                "columns": ["location", { "name": "user_id", "type": "bigint" }]
            }
        ]
    })
}

fn views() -> HandlebarsViews {
    let mut views = HandlebarsViews::new();
    let templates = [
        ("users/index", "{{#each items}}{{name}};{{/each}}{{flash.status.success}}{{flash.status.info}}"),
        (
            "users/create",
            "create form{{#each errors}} {{@key}}{{/each}}{{#if old.name}} name={{old.name}}{{/if}}{{#if old.email}} email={{old.email}}{{/if}}{{#if old.password}} password={{old.password}}{{/if}}",
        ),
        ("users/show", "{{model.name}}"),
        ("users/edit", "edit {{model.name}}"),
        ("users/ajax/show", "ajax {{model.name}}"),
    ];
    for (name, source) in templates {
        views.register(name, source).unwrap();
    }
    views
}

pub struct TestApp {
    pub store: MemoryStore,
    pub model: Arc<ResolvedModel>,
    pub router: Router,
    pub storage_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, self.body))
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Decoded value of the `flash.{key}` cookie set by this response.
    pub fn flash(&self, key: &str) -> Option<String> {
        let prefix = format!("flash.{}=", key);
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find_map(|pair| pair.strip_prefix(&prefix).map(|v| url_escape::decode(v).into_owned()))
    }

    /// `Cookie` header a browser would send back after this response.
    pub fn cookie_header(&self) -> String {
        self.set_cookies()
            .iter()
            .filter_map(|c| c.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_trashed() -> Self {
        Self::build(true)
    }

    fn build(with_trashed: bool) -> Self {
        let lang = Translator::default();
        let config = load_from_str(&resources_json(with_trashed).to_string()).unwrap();
        let model = resolve(&config, &lang).unwrap();
        let storage_dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let settings = Settings {
            storage_root: storage_dir.path().to_path_buf(),
            ..Settings::default()
        };
        let state = AppState::new(
            Arc::new(store.clone()),
            model,
            Arc::new(views()),
            Arc::new(LocalStorage::new(storage_dir.path())),
            lang,
            settings,
        );
        TestApp {
            store,
            model: state.model.clone(),
            router: app(state),
            storage_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.store.rows(&format!("public.{}", table)).await
    }

    /// Insert a row directly, bypassing the controller.
    pub async fn seed(&self, resource: &str, data: Value) -> Record {
        let table = &self.model.resource(resource).unwrap().table;
        let mut tx = self.store.begin().await.unwrap();
        let row = tx
            .insert(table, data.as_object().unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        row
    }

    /// Store a valid user through the JSON API and return the response.
    pub async fn create_user(&self, extra: Value) -> TestResponse {
        let mut body = json!({ "name": "Ana", "email": "ana@example.com", "password": "secret" });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        self.send(json_request("POST", "/users", body)).await
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

pub fn html_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
        .body(Body::empty())
        .unwrap()
}

pub fn form_request(method: &str, uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                url_escape::encode_component(k),
                url_escape::encode_component(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "text/html")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// `multipart/form-data` body with text fields and `(field, file name, bytes)` file parts.
pub fn multipart_request(uri: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for (name, file_name, data) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
