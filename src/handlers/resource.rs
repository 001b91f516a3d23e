//! Resource controller actions: index, create, store, show, edit, update, destroy.
//!
//! Every action answers in one of two modes picked from the request: JSON clients get the
//! envelope, paginator or raw record; browsers get rendered views and flash redirects.

use crate::error::AppError;
use crate::extractors::{RequestContext, ResourcePayload};
use crate::flash;
use crate::response::{envelope, not_found_json, success_json, unprocessable_json};
use crate::service::{Messages, ResourceService};
use crate::state::ResourceState;
use crate::store::Record;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn service(rs: &ResourceState) -> ResourceService<'_> {
    ResourceService::new(&rs.app, &rs.resource)
}

async fn lookup(service: &ResourceService<'_>, key: &str) -> Result<Record, AppError> {
    service
        .find(key)
        .await?
        .ok_or_else(|| AppError::NotFound(key.to_string()))
}

/// Flash entries for templates: `status.success` is exposed as `flash.status.success`;
/// `errors` and `old` are decoded into top-level objects.
fn flash_data(ctx: &RequestContext) -> (Value, Value, Value) {
    let mut flash = Map::new();
    let mut errors = Value::Object(Map::new());
    let mut old = Value::Object(Map::new());
    let decode = |value: &str| serde_json::from_str(value).unwrap_or_else(|_| Value::Object(Map::new()));
    for (key, value) in &ctx.flash {
        if key == flash::ERRORS {
            errors = decode(value);
            continue;
        }
        if key == flash::OLD {
            old = decode(value);
            continue;
        }
        match key.split_once('.') {
            Some((group, name)) => {
                let slot = flash
                    .entry(group.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(inner) = slot {
                    inner.insert(name.to_string(), Value::String(value.clone()));
                }
            }
            None => {
                flash.insert(key.clone(), Value::String(value.clone()));
            }
        }
    }
    (Value::Object(flash), errors, old)
}

/// Scalar fields of a submitted form, kept so a rejected form can be filled again.
/// Password fields are never carried over.
fn old_input(fields: &Record) -> String {
    let kept: Map<String, Value> = fields
        .iter()
        .filter(|(name, _)| !name.to_ascii_lowercase().contains("password"))
        .filter(|(_, value)| matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Value::Object(kept).to_string()
}

fn render(rs: &ResourceState, ctx: &RequestContext, action: &str, mut data: Map<String, Value>) -> Response {
    let view = rs.resource.view_location(action, ctx.ajax);
    let views = &rs.app.views;
    if !views.exists(&view) {
        let message = Messages::new(&rs.app.lang).view_not_found(&view);
        tracing::error!(resource = %rs.resource.name, view = %view, "{}", message);
        return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
    }

    let (flash_value, errors, old) = flash_data(ctx);
    data.insert("resource".into(), Value::String(rs.resource.name.clone()));
    data.insert("route".into(), Value::String(rs.resource.route_name(action)));
    data.insert("index_url".into(), Value::String(rs.app.index_url(&rs.resource)));
    data.insert("flash".into(), flash_value);
    data.insert("errors".into(), errors);
    data.insert("old".into(), old);

    match views.render(&view, &Value::Object(data)) {
        Ok(html) => (flash::clear(ctx.cookies.clone(), ctx.flash.keys()), Html(html)).into_response(),
        Err(e) => {
            tracing::error!(resource = %rs.resource.name, view = %view, error = %e, "view rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Map an action error onto the response mode of the request.
fn failure(rs: &ResourceState, ctx: &RequestContext, err: AppError) -> Response {
    let index = rs.app.index_url(&rs.resource);
    if ctx.wants_json {
        return match err {
            AppError::Validation(errors) => {
                unprocessable_json(serde_json::to_value(&errors).unwrap_or_default(), &index)
            }
            AppError::NotFound(_) => not_found_json(&index),
            other => envelope(other.status(), other.to_string(), Value::Array(Vec::new()), &index),
        };
    }
    match err {
        AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        AppError::Validation(errors) => flash::redirect(
            ctx.cookies.clone(),
            ctx.back_or(&index),
            &[(flash::ERRORS, serde_json::to_string(&errors).unwrap_or_default())],
        ),
        AppError::ViewNotFound(_) | AppError::View(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        other => flash::redirect(
            ctx.cookies.clone(),
            ctx.back_or(&index),
            &[(flash::ERROR, other.to_string())],
        ),
    }
}

/// Like `failure`, but a browser sent back to its form also gets the submitted input.
fn rejected(rs: &ResourceState, ctx: &RequestContext, err: AppError, old: String) -> Response {
    let index = rs.app.index_url(&rs.resource);
    match err {
        AppError::Validation(errors) if !ctx.wants_json => flash::redirect(
            ctx.cookies.clone(),
            ctx.back_or(&index),
            &[
                (flash::ERRORS, serde_json::to_string(&errors).unwrap_or_default()),
                (flash::OLD, old),
            ],
        ),
        other => failure(rs, ctx, other),
    }
}

/// Success of a mutating action: envelope for JSON, redirect to the index with a flash otherwise.
fn completed(rs: &ResourceState, ctx: &RequestContext, flash_key: &str, message: String) -> Response {
    let index = rs.app.index_url(&rs.resource);
    if ctx.wants_json {
        success_json(message, &index)
    } else {
        flash::redirect(ctx.cookies.clone(), &index, &[(flash_key, message)])
    }
}

/// GET /{resource}
pub async fn index(
    State(rs): State<ResourceState>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = match service(&rs).paginate(query.page, query.per_page).await {
        Ok(page) => page,
        Err(e) => return failure(&rs, &ctx, e),
    };
    if ctx.wants_json {
        return Json(page).into_response();
    }
    let mut data = Map::new();
    data.insert("items".into(), json!(page.data));
    data.insert("paginator".into(), json!(page));
    render(&rs, &ctx, "index", data)
}

/// GET /{resource}/create
pub async fn create(State(rs): State<ResourceState>, ctx: RequestContext) -> Response {
    if ctx.wants_json {
        return not_found_json(&rs.app.index_url(&rs.resource));
    }
    let mut data = Map::new();
    data.insert("model".into(), Value::Object(rs.resource.blank_record()));
    render(&rs, &ctx, "create", data)
}

/// POST /{resource}
pub async fn store(
    State(rs): State<ResourceState>,
    ctx: RequestContext,
    payload: Result<ResourcePayload, AppError>,
) -> Response {
    let payload = match payload {
        Ok(p) => p,
        Err(e) => return failure(&rs, &ctx, e),
    };
    let old = old_input(&payload.fields);
    match service(&rs).store(payload.fields, payload.files).await {
        Ok((_, message)) => completed(&rs, &ctx, flash::SUCCESS, message),
        Err(e) => rejected(&rs, &ctx, e, old),
    }
}

/// GET /{resource}/{key}
pub async fn show(State(rs): State<ResourceState>, ctx: RequestContext, Path(key): Path<String>) -> Response {
    let record = match lookup(&service(&rs), &key).await {
        Ok(record) => record,
        Err(e) => return failure(&rs, &ctx, e),
    };
    if ctx.wants_json {
        return Json(Value::Object(record)).into_response();
    }
    let mut data = Map::new();
    data.insert("model".into(), Value::Object(record));
    render(&rs, &ctx, "show", data)
}

/// GET /{resource}/{key}/edit
pub async fn edit(State(rs): State<ResourceState>, ctx: RequestContext, Path(key): Path<String>) -> Response {
    if ctx.wants_json {
        return not_found_json(&rs.app.index_url(&rs.resource));
    }
    match lookup(&service(&rs), &key).await {
        Ok(record) => {
            let mut data = Map::new();
            data.insert("model".into(), Value::Object(record));
            render(&rs, &ctx, "edit", data)
        }
        Err(e) => failure(&rs, &ctx, e),
    }
}

async fn update_action(
    rs: &ResourceState,
    ctx: &RequestContext,
    key: &str,
    payload: ResourcePayload,
    partial: bool,
) -> Response {
    let service = service(rs);
    let old = old_input(&payload.fields);
    let result = async {
        let record = lookup(&service, key).await?;
        service
            .update(key, record, payload.fields, payload.files, partial)
            .await
    }
    .await;
    match result {
        Ok((_, message)) => completed(rs, ctx, flash::SUCCESS, message),
        Err(e) => rejected(rs, ctx, e, old),
    }
}

async fn destroy_action(rs: &ResourceState, ctx: &RequestContext, key: &str) -> Response {
    let service = service(rs);
    let result = async {
        let record = lookup(&service, key).await?;
        service.destroy(key, record).await
    }
    .await;
    match result {
        Ok((_, message)) => completed(rs, ctx, flash::INFO, message),
        Err(e) => failure(rs, ctx, e),
    }
}

/// PUT /{resource}/{key}: every validation rule applies.
pub async fn update(
    State(rs): State<ResourceState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<ResourcePayload, AppError>,
) -> Response {
    match payload {
        Ok(payload) => update_action(&rs, &ctx, &key, payload, false).await,
        Err(e) => failure(&rs, &ctx, e),
    }
}

/// PATCH /{resource}/{key}: only submitted fields are validated.
pub async fn patch(
    State(rs): State<ResourceState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<ResourcePayload, AppError>,
) -> Response {
    match payload {
        Ok(payload) => update_action(&rs, &ctx, &key, payload, true).await,
        Err(e) => failure(&rs, &ctx, e),
    }
}

/// DELETE /{resource}/{key}
pub async fn destroy(State(rs): State<ResourceState>, ctx: RequestContext, Path(key): Path<String>) -> Response {
    destroy_action(&rs, &ctx, &key).await
}

/// POST /{resource}/{key} from HTML forms, dispatched on the `_method` field.
pub async fn spoofed(
    State(rs): State<ResourceState>,
    ctx: RequestContext,
    Path(key): Path<String>,
    payload: Result<ResourcePayload, AppError>,
) -> Response {
    let payload = match payload {
        Ok(p) => p,
        Err(e) => return failure(&rs, &ctx, e),
    };
    match payload.method.as_deref() {
        Some("PUT") => update_action(&rs, &ctx, &key, payload, false).await,
        Some("PATCH") => update_action(&rs, &ctx, &key, payload, true).await,
        Some("DELETE") => destroy_action(&rs, &ctx, &key).await,
        _ if ctx.wants_json => envelope(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            Value::Array(Vec::new()),
            &rs.app.index_url(&rs.resource),
        ),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
