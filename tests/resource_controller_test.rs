//! End-to-end checks of the resource actions through the router, against the memory store.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::*;
use serde_json::{json, Value};

fn column(rows: &[resource_controller::store::Record], name: &str) -> Vec<Value> {
    rows.iter().map(|r| r.get(name).cloned().unwrap_or(Value::Null)).collect()
}

fn delete_json(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_and_readiness() {
    let app = TestApp::new();
    let health = app.send(json_get("/health")).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json(), json!({ "status": "ok" }));

    let ready = app.send(json_get("/ready")).await;
    assert_eq!(ready.json(), json!({ "status": "ok", "database": "ok" }));
}

#[tokio::test]
async fn json_store_returns_envelope_and_creates_has_many_rows() {
    let app = TestApp::new();
    let response = app
        .create_user(json!({
            "hasManyRelated": {
                "1": { "a": "a1", "b": "b1", "c": "c1" },
                "2": { "a": "a2", "b": "b2", "c": "c2" }
            }
        }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "code": "200",
            "message": "Newly created record number: 1",
            "errors": [],
            "redirect": "/users"
        })
    );
    let users = app.rows("users").await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], json!("Ana"));
    assert!(users[0]["created_at"].is_string());

    let related = app.rows("related").await;
    assert_eq!(related.len(), 2);
    assert_eq!(column(&related, "user_id"), vec![json!(1), json!(1)]);
    assert_eq!(column(&related, "a"), vec![json!("a1"), json!("a2")]);
}

#[tokio::test]
async fn has_one_payload_is_upserted() {
    let app = TestApp::new();
    app.create_user(json!({ "hasOneRelated": { "a": "first" } })).await;
    assert_eq!(app.rows("related").await.len(), 1);

    let response = app
        .send(json_request("PATCH", "/users/1", json!({ "hasOneRelated": { "a": "second" } })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], json!("Register successfully updated: 1"));

    let related = app.rows("related").await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["a"], json!("second"));
    assert_eq!(related[0]["user_id"], json!(1));
}

#[tokio::test]
async fn morph_one_and_morph_many_stamp_the_morph_columns() {
    let one = TestApp::new();
    one.create_user(json!({ "morphOneRelated": { "a": "one" } })).await;
    one.send(json_request("PATCH", "/users/1", json!({ "morphOneRelated": { "a": "again" } })))
        .await;

    let many = TestApp::new();
    many.create_user(json!({ "morphManyRelated": [{ "a": "many-1" }, { "a": "many-2" }] }))
        .await;

    let singular = one.rows("related").await;
    let plural = many.rows("related").await;
    assert_eq!(singular.len(), 1);
    assert_eq!(singular[0]["a"], json!("again"));
    assert_eq!(plural.len(), 2);
    for row in singular.iter().chain(plural.iter()) {
        assert_eq!(row["relatable_id"], json!(1));
        assert_eq!(row["relatable_type"], json!("users"));
        assert_eq!(row["user_id"], Value::Null);
    }
}

#[tokio::test]
async fn belongs_to_creates_related_row_and_points_parent_at_it() {
    let app = TestApp::new();
    app.create_user(json!({ "belongsToRelated": { "a": "owner" } })).await;

    let users = app.rows("users").await;
    assert_eq!(users[0]["related_id"], json!(1));

    app.send(json_request("PATCH", "/users/1", json!({ "belongsToRelated": { "a": "changed" } })))
        .await;
    let related = app.rows("related").await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["a"], json!("changed"));
}

#[tokio::test]
async fn has_many_entries_with_ids_update_owned_rows() {
    let app = TestApp::new();
    app.create_user(json!({ "hasManyRelated": [{ "a": "one" }, { "a": "two" }] })).await;

    let response = app
        .send(json_request(
            "PATCH",
            "/users/1",
            json!({ "hasManyRelated": [{ "id": 1, "a": "edited" }, { "a": "three" }] }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let related = app.rows("related").await;
    assert_eq!(column(&related, "a"), vec![json!("edited"), json!("two"), json!("three")]);
}

#[tokio::test]
async fn belongs_to_many_resync_leaves_exactly_the_new_set() {
    let app = TestApp::new();
    let response = app
        .send(form_request(
            "POST",
            "/users",
            &[
                ("name", "Ana"),
                ("email", "ana@example.com"),
                ("belongsToManyRelated[4]", "on"),
                ("belongsToManyRelated[9]", "on"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(column(&app.rows("related_user").await, "related_id"), vec![json!(4), json!(9)]);

    let response = app
        .send(json_request(
            "PUT",
            "/users/1",
            json!({ "name": "Ana", "email": "ana@example.com", "belongsToManyRelated": ["9", "12", "12"] }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let pivot = app.rows("related_user").await;
    assert_eq!(column(&pivot, "related_id"), vec![json!(9), json!(12)]);
    assert_eq!(column(&pivot, "user_id"), vec![json!(1), json!(1)]);
}

#[tokio::test]
async fn morph_to_many_objects_create_related_rows_and_join_rows() {
    let app = TestApp::new();
    app.create_user(json!({ "morphToManyRelated": [{ "a": "x" }, { "a": "y" }] })).await;

    assert_eq!(app.rows("related").await.len(), 2);
    let pivot = app.rows("relatables").await;
    assert_eq!(column(&pivot, "related_id"), vec![json!(1), json!(2)]);
    assert!(pivot.iter().all(|r| r["relatable_id"] == json!(1) && r["relatable_type"] == json!("users")));
}

#[tokio::test]
async fn unknown_relation_creates_nothing() {
    let app = TestApp::new();
    let response = app.create_user(json!({ "nope": { "a": 1 } })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        json!("Array type request data 'nope' is not named after an existent relation.")
    );
    assert!(app.rows("users").await.is_empty());
    assert!(app.rows("related").await.is_empty());

    let html = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::REFERER, "/users/create")
                .body(Body::from("name=Ana&email=ana%40example.com&nope%5Ba%5D=1"))
                .unwrap(),
        )
        .await;
    assert_eq!(html.status, StatusCode::FOUND);
    assert_eq!(html.location(), Some("/users/create"));
    assert!(html.flash("status.error").unwrap().contains("'nope'"));
    assert!(app.rows("users").await.is_empty());
}

#[tokio::test]
async fn failed_relation_write_rolls_back_the_parent() {
    let app = TestApp::new();
    app.seed("related", json!({ "id": 5, "a": "taken" })).await;

    let response = app.create_user(json!({ "hasManyRelated": [{ "id": 5, "a": "clash" }] })).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["code"], json!("409"));
    assert!(app.rows("users").await.is_empty());
    assert_eq!(app.rows("related").await.len(), 1);
}

#[tokio::test]
async fn json_validation_failure_is_422_with_field_errors() {
    let app = TestApp::new();
    let response = app
        .send(json_request("POST", "/users", json!({ "name": "A", "email": "nope" })))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert_eq!(body["code"], json!("422"));
    assert_eq!(body["message"], json!("Unprocessable Entity"));
    assert_eq!(body["errors"]["name"], json!(["name must be at least 2 characters"]));
    assert_eq!(body["errors"]["email"], json!(["email must be a valid address"]));
    assert!(app.rows("users").await.is_empty());
}

#[tokio::test]
async fn html_validation_failure_redirects_back_with_errors() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::REFERER, "/users/create")
                .body(Body::from("name="))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/users/create"));
    let errors: Value = serde_json::from_str(&response.flash("errors").unwrap()).unwrap();
    assert!(errors.get("name").is_some());
    assert!(errors.get("email").is_some());

    let form = app
        .send(
            Request::builder()
                .uri("/users/create")
                .header(header::COOKIE, response.cookie_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.starts_with("create form"));
    assert!(form.body.contains(" email"));
    assert!(form.body.contains(" name"));
    assert!(form.set_cookies().iter().any(|c| c.starts_with("flash.errors=") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn html_validation_failure_keeps_submitted_input() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::REFERER, "/users/create")
                .body(Body::from("_token=csrf&name=A&email=ana%40example.com&password=hunter22"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/users/create"));
    let old: Value = serde_json::from_str(&response.flash("old").unwrap()).unwrap();
    assert_eq!(old, json!({ "name": "A", "email": "ana@example.com" }));
    assert!(app.rows("users").await.is_empty());

    let form = app
        .send(
            Request::builder()
                .uri("/users/create")
                .header(header::COOKIE, response.cookie_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.body, "create form name name=A email=ana@example.com");
    assert!(!form.body.contains("hunter22"));
    assert!(form.set_cookies().iter().any(|c| c.starts_with("flash.old=") && c.contains("Max-Age=0")));

    let json = app
        .send(json_request("POST", "/users", json!({ "name": "A", "email": "ana@example.com" })))
        .await;
    assert_eq!(json.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json.flash("old").is_none());
}

#[tokio::test]
async fn html_store_redirects_to_index_and_flash_shows_once() {
    let app = TestApp::new();
    let response = app
        .send(form_request(
            "POST",
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com"), ("_token", "csrf")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/users"));
    assert_eq!(
        response.flash("status.success").as_deref(),
        Some("Newly created record number: 1")
    );

    let index = app
        .send(
            Request::builder()
                .uri("/users")
                .header(header::COOKIE, response.cookie_header())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.body, "Ana;Newly created record number: 1");
    assert!(index.set_cookies().iter().any(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn index_paginates_json() {
    let app = TestApp::new();
    for name in ["u1", "u2", "u3"] {
        app.seed("users", json!({ "name": name, "email": format!("{}@example.com", name) }))
            .await;
    }
    let page = app.send(json_get("/users?page=2&per_page=2")).await.json();
    assert_eq!(page["current_page"], json!(2));
    assert_eq!(page["per_page"], json!(2));
    assert_eq!(page["total"], json!(3));
    assert_eq!(page["last_page"], json!(2));
    assert_eq!(page["from"], json!(3));
    assert_eq!(page["to"], json!(3));
    assert_eq!(page["data"][0]["name"], json!("u3"));

    let html = app.send(html_get("/users")).await;
    assert_eq!(html.body, "u1;u2;u3;");
}

#[tokio::test]
async fn read_actions_by_response_mode() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    let show = app.send(json_get("/users/1")).await;
    assert_eq!(show.status, StatusCode::OK);
    assert_eq!(show.json()["name"], json!("Ana"));
    assert_eq!(show.json()["id"], json!(1));

    assert_eq!(app.send(html_get("/users/1")).await.body, "Ana");
    assert_eq!(app.send(html_get("/users/1/edit")).await.body, "edit Ana");
    assert_eq!(app.send(html_get("/users/create")).await.body, "create form");

    for uri in ["/users/create", "/users/1/edit", "/users/99"] {
        let response = app.send(json_get(uri)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(
            response.json(),
            json!({ "code": "404", "message": "Not found", "errors": [], "redirect": "/users" })
        );
    }

    let missing = app.send(html_get("/users/99")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body, "Not Found");
}

#[tokio::test]
async fn ajax_requests_use_ajax_views() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;
    let ajax = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.send(ajax("/users/1")).await.body, "ajax Ana");

    let missing = app.send(ajax("/users")).await;
    assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        missing.body,
        "Requested page couldn't be loaded because the view file is missing: users/ajax/index"
    );
}

#[tokio::test]
async fn put_validates_everything_patch_only_submitted_fields() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    let put = app.send(json_request("PUT", "/users/1", json!({ "name": "Bo" }))).await;
    assert_eq!(put.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(put.json()["errors"].get("email").is_some());

    let patch = app.send(json_request("PATCH", "/users/1", json!({ "name": "Bo" }))).await;
    assert_eq!(patch.status, StatusCode::OK);
    let users = app.rows("users").await;
    assert_eq!(users[0]["name"], json!("Bo"));
    assert_eq!(users[0]["email"], json!("ana@example.com"));
}

#[tokio::test]
async fn destroy_soft_deletes_and_hides_the_row() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    let response = app.send(delete_json("/users/1")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], json!("Register successfully deleted: 1"));

    let users = app.rows("users").await;
    assert_eq!(users.len(), 1);
    assert!(users[0]["deleted_at"].is_string());

    assert_eq!(app.send(json_get("/users/1")).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.send(delete_json("/users/1")).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.send(json_request("PATCH", "/users/1", json!({ "name": "Bo" }))).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.send(json_get("/users")).await.json()["total"], json!(0));
}

#[tokio::test]
async fn with_trashed_reaches_deleted_rows_but_cannot_destroy_them_again() {
    let app = TestApp::with_trashed();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    app.send(delete_json("/users/1")).await;
    let show = app.send(json_get("/users/1")).await;
    assert_eq!(show.status, StatusCode::OK);
    let deleted_at = show.json()["deleted_at"].clone();
    assert!(deleted_at.is_string());

    let edit = app.send(html_get("/users/1/edit")).await;
    assert_eq!(edit.body, "edit Ana");

    let response = app.send(delete_json("/users/1")).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json(),
        json!({
            "code": "409",
            "message": "Operation failed while destroying the record: 1",
            "errors": [],
            "redirect": "/users"
        })
    );

    let html = app
        .send(form_request("POST", "/users/1", &[("_method", "DELETE")]))
        .await;
    assert_eq!(html.status, StatusCode::FOUND);
    assert_eq!(
        html.flash("status.error").as_deref(),
        Some("Operation failed while destroying the record: 1")
    );

    let rows = app.rows("users").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["deleted_at"], deleted_at);
}

#[tokio::test]
async fn html_forms_spoof_put_patch_and_delete() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    let patched = app
        .send(form_request("POST", "/users/1", &[("_method", "PATCH"), ("name", "Renamed")]))
        .await;
    assert_eq!(patched.status, StatusCode::FOUND);
    assert_eq!(patched.location(), Some("/users"));
    assert_eq!(
        patched.flash("status.success").as_deref(),
        Some("Register successfully updated: 1")
    );
    assert_eq!(app.rows("users").await[0]["name"], json!("Renamed"));

    let put = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/users/1")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::REFERER, "/users/1/edit")
                .body(Body::from("_method=put&name=Solo"))
                .unwrap(),
        )
        .await;
    assert_eq!(put.status, StatusCode::FOUND);
    assert_eq!(put.location(), Some("/users/1/edit"));
    assert!(put.flash("errors").is_some());

    let bare = app.send(form_request("POST", "/users/1", &[("name", "x")])).await;
    assert_eq!(bare.status, StatusCode::METHOD_NOT_ALLOWED);

    let deleted = app.send(form_request("POST", "/users/1", &[("_method", "DELETE")])).await;
    assert_eq!(deleted.status, StatusCode::FOUND);
    assert_eq!(
        deleted.flash("status.info").as_deref(),
        Some("Register successfully deleted: 1")
    );
    assert!(app.rows("users").await[0]["deleted_at"].is_string());
}

#[tokio::test]
async fn multipart_files_go_to_column_and_plural_relation() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request(
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com")],
            &[
                ("avatar", "me.png", b"avatar-bytes"),
                ("hasManyFileUploads[]", "a.png", b"first"),
                ("hasManyFileUploads[]", "b.png", b"second"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let users = app.rows("users").await;
    let avatar = users[0]["avatar"].as_str().unwrap().to_string();
    assert!(avatar.starts_with("uploads/") && avatar.ends_with(".png"), "{}", avatar);
    assert_eq!(
        std::fs::read(app.storage_dir.path().join(&avatar)).unwrap(),
        b"avatar-bytes"
    );

    let uploads = app.rows("uploads").await;
    assert_eq!(uploads.len(), 2);
    assert_eq!(column(&uploads, "user_id"), vec![json!(1), json!(1)]);
    for row in &uploads {
        let location = row["location"].as_str().unwrap();
        assert!(app.storage_dir.path().join(location).is_file());
    }
}

#[tokio::test]
async fn indexed_upload_replaces_the_named_related_row() {
    let app = TestApp::new();
    app.send(multipart_request(
        "/users",
        &[("name", "Ana"), ("email", "ana@example.com")],
        &[("hasManyFileUploads[]", "a.png", b"first")],
    ))
    .await;
    let before = app.rows("uploads").await[0]["location"].clone();

    let response = app
        .send(multipart_request(
            "/users/1",
            &[("_method", "PATCH")],
            &[("hasManyFileUploads[1]", "c.png", b"replacement")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let uploads = app.rows("uploads").await;
    assert_eq!(uploads.len(), 1);
    assert_ne!(uploads[0]["location"], before);
}

#[tokio::test]
async fn single_file_to_belongs_to_relation_links_parent() {
    let app = TestApp::new();
    app.send(multipart_request(
        "/users",
        &[("name", "Ana"), ("email", "ana@example.com")],
        &[("belongsToFileUpload", "doc.png", b"doc")],
    ))
    .await;

    assert_eq!(app.rows("uploads").await.len(), 1);
    assert_eq!(app.rows("users").await[0]["upload_id"], json!(1));
}

#[tokio::test]
async fn file_for_unknown_target_is_rejected_before_writing() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request(
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com")],
            &[("nope", "x.png", b"x")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        json!("Request file 'nope' is not named after an existent relation.")
    );
    assert!(app.rows("users").await.is_empty());
    assert!(!app.storage_dir.path().join("uploads").exists());
}

#[tokio::test]
async fn keys_that_do_not_fit_the_key_column_are_not_found() {
    let app = TestApp::new();
    app.seed("users", json!({ "name": "Ana", "email": "ana@example.com" })).await;

    let show = app.send(json_get("/users/abc")).await;
    assert_eq!(show.status, StatusCode::NOT_FOUND);
    assert_eq!(show.json()["message"], json!("Not found"));

    let page = app.send(html_get("/users/abc")).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let update = app
        .send(json_request("PUT", "/users/1.5", json!({ "name": "Other", "email": "o@example.com" })))
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);

    let destroy = app.send(delete_json("/users/99999999999999999999")).await;
    assert_eq!(destroy.status, StatusCode::NOT_FOUND);

    let rows = app.rows("users").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Ana"));
    assert!(rows[0]["deleted_at"].is_null());
}

#[tokio::test]
async fn empty_file_fails_the_upload_before_writing() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request(
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com")],
            &[("hasManyFileUploads[]", "a.png", b"")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        json!("The file 'hasManyFileUploads[]' could not be uploaded.")
    );
    assert!(app.rows("users").await.is_empty());
    assert!(app.rows("uploads").await.is_empty());
    assert!(!app.storage_dir.path().join("uploads").exists());
}

#[tokio::test]
async fn single_file_to_has_one_relation_points_it_at_the_parent() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request(
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com")],
            &[("hasOneFileUpload", "card.png", b"card")],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let uploads = app.rows("uploads").await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["user_id"], json!(1));
    let location = uploads[0]["location"].as_str().unwrap();
    assert_eq!(std::fs::read(app.storage_dir.path().join(location)).unwrap(), b"card");
    assert!(app.rows("users").await[0]["upload_id"].is_null());
}

#[tokio::test]
async fn files_to_many_to_many_relation_create_rows_and_join_rows() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request(
            "/users",
            &[("name", "Ana"), ("email", "ana@example.com")],
            &[
                ("belongsToManyFileUploads[]", "a.png", b"first"),
                ("belongsToManyFileUploads[]", "b.png", b"second"),
            ],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let uploads = app.rows("uploads").await;
    assert_eq!(uploads.len(), 2);
    assert_eq!(column(&uploads, "user_id"), vec![Value::Null, Value::Null]);
    for row in &uploads {
        assert!(app.storage_dir.path().join(row["location"].as_str().unwrap()).is_file());
    }

    let pivot = app.rows("upload_user").await;
    assert_eq!(column(&pivot, "user_id"), vec![json!(1), json!(1)]);
    assert_eq!(column(&pivot, "upload_id"), vec![json!(1), json!(2)]);
}
