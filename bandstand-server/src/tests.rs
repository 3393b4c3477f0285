use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use bandstand_core::{AudioStorage, Bandstand, SqliteDatabase};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::ServerContext;

const BOUNDARY: &str = "bandstand-test-boundary";

async fn app() -> (axum::Router, TempDir) {
    let db = SqliteDatabase::connect("sqlite::memory:")
        .await
        .expect("in-memory database connects");

    let dir = tempfile::tempdir().unwrap();

    let context = ServerContext {
        bandstand: Arc::new(Bandstand::new(db, AudioStorage::new(dir.path()))),
    };

    (crate::router(context), dir)
}

fn json_request(method: &str, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let body = body
        .map(|b| Body::from(serde_json::to_vec(&b).unwrap()))
        .unwrap_or_else(Body::empty);

    builder.body(body).unwrap()
}

fn upload_request(path: &str, token: &str, name: Option<&str>, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();

    if let Some(name) = name {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"upload.m4a\"\r\nContent-Type: audio/x-m4a\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, bytes.to_vec())
}

async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, value)
}

/// Registers a user and logs them in, returning (user id, token)
async fn register_and_login(app: &axum::Router, name: &str, email: &str) -> (i64, String) {
    let (status, user) = send_json(
        app,
        json_request(
            "POST",
            "/users",
            None,
            Some(json!({ "name": name, "email": email, "password": "sheena is a punk rocker" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, login) = send_json(
        app,
        json_request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": email, "password": "sheena is a punk rocker" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        user["id"].as_i64().unwrap(),
        login["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn band_membership_and_audio_lifecycle() {
    let (app, dir) = app().await;

    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;
    let (dee_dee, _) = register_and_login(&app, "Dee Dee", "deedee@x.com").await;

    // Create the band, the creator becomes its first member
    let (status, band) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(band["name"], "Ramones");
    let band_id = band["id"].as_i64().unwrap();

    // The fresh band has no audio yet
    let (status, shown) = send_json(
        &app,
        json_request("GET", &format!("/bands/{band_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["audios"], json!([]));

    // Connect a second member
    let (status, connected) = send_json(
        &app,
        json_request(
            "POST",
            &format!("/bands/{band_id}/user/{dee_dee}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(connected["id"].as_i64(), Some(band_id));

    // Connecting the same pair again is a conflict
    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            &format!("/bands/{band_id}/user/{dee_dee}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Disconnect, then a second disconnect reports the missing membership
    let (status, _) = send_json(
        &app,
        json_request(
            "DELETE",
            &format!("/bands/{band_id}/user/{dee_dee}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        json_request(
            "DELETE",
            &format!("/bands/{band_id}/user/{dee_dee}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Upload a demo
    let payload = b"pretend these are m4a bytes";
    let (status, audio) = send_json(
        &app,
        upload_request(
            &format!("/bands/{band_id}/upload"),
            &token,
            Some("demo"),
            payload,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audio["name"], "demo");
    let audio_id = audio["id"].as_i64().unwrap();

    let audio_dir = dir.path().join("Uploads").join("Ramones").join("Audio");
    assert_eq!(audio_dir.read_dir().unwrap().count(), 1);

    // Download round-trips the metadata and the exact bytes
    let (status, body) = send(
        &app,
        json_request(
            "GET",
            &format!("/bands/{band_id}/audio/{audio_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body_text = String::from_utf8_lossy(&body);
    assert!(body_text.contains("\"name\":\"demo\""));
    assert!(body_text.contains("Content-Type: audio/x-m4a"));
    assert!(body
        .windows(payload.len())
        .any(|window| window == payload));

    // Delete removes the row and the backing file
    let (status, deleted) = send_json(
        &app,
        json_request(
            "DELETE",
            &format!("/bands/{band_id}/audio/{audio_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({}));
    assert_eq!(audio_dir.read_dir().unwrap().count(), 0);

    let (status, _) = send_json(
        &app,
        json_request(
            "DELETE",
            &format!("/bands/{band_id}/audio/{audio_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resolvers_short_circuit_with_not_found() {
    let (app, _dir) = app().await;
    let (joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (status, _) = send_json(&app, json_request("GET", "/bands/99", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        json_request("POST", "/bands/99/user/1", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, band) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let band_id = band["id"].as_i64().unwrap();

    // The target user resolver fails, so no membership is touched
    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            &format!("/bands/{band_id}/user/99"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The creator's own membership is still the only one
    let (status, _) = send_json(
        &app,
        json_request(
            "DELETE",
            &format!("/bands/{band_id}/user/{joey}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, json_request("GET", "/users/99", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_names_and_emails_conflict() {
    let (app, _dir) = app().await;
    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            "/users",
            None,
            Some(json!({ "name": "Impostor", "email": "joey@x.com", "password": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, bands) = send_json(&app, json_request("GET", "/bands/all", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bands.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn band_routes_require_a_session() {
    let (app, _dir) = app().await;

    let (status, _) = send_json(&app, json_request("GET", "/bands", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&app, json_request("GET", "/bands", Some("bogus"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        json_request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "nope" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_uploads_are_rejected() {
    let (app, dir) = app().await;
    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (status, band) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let band_id = band["id"].as_i64().unwrap();

    let (status, _) = send_json(
        &app,
        upload_request(&format!("/bands/{band_id}/upload"), &token, Some("demo"), b""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A missing name field is also rejected
    let (status, _) = send_json(
        &app,
        upload_request(&format!("/bands/{band_id}/upload"), &token, None, b"bytes"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was recorded or written
    let (status, shown) = send_json(
        &app,
        json_request("GET", &format!("/bands/{band_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["audios"], json!([]));
    assert!(!dir.path().join("Uploads").exists());
}

#[tokio::test]
async fn profile_lists_the_callers_bands() {
    let (app, _dir) = app().await;
    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;
    let (_other, other_token) = register_and_login(&app, "Glenn", "glenn@x.com").await;

    send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    send_json(
        &app,
        json_request(
            "POST",
            "/bands",
            Some(&other_token),
            Some(json!({ "name": "Misfits" })),
        ),
    )
    .await;

    let (status, profile) = send_json(&app, json_request("GET", "/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["email"], "joey@x.com");

    let bands = profile["bands"].as_array().unwrap();
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0]["name"], "Ramones");

    // Caller-scoped listing matches, the full listing sees both
    let (_, mine) = send_json(&app, json_request("GET", "/bands", Some(&token), None)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, all) = send_json(&app, json_request("GET", "/bands/all", Some(&token), None)).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_can_be_updated_and_cleared() {
    let (app, _dir) = app().await;
    let (joey, _token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (status, updated) = send_json(
        &app,
        json_request(
            "PATCH",
            &format!("/users/{joey}"),
            None,
            Some(json!({ "name": "Jeffrey" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Jeffrey");
    assert_eq!(updated["email"], "joey@x.com");

    let (status, listed) = send_json(&app, json_request("GET", "/users", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Passwords are never serialized
    assert!(listed[0].get("password").is_none());

    let (status, _) = send_json(&app, json_request("DELETE", "/users", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send_json(&app, json_request("GET", "/users", None, None)).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let (app, _dir) = app().await;
    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (status, _) = send_json(&app, json_request("POST", "/logout", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, json_request("GET", "/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_band_removes_it_for_its_members() {
    let (app, dir) = app().await;
    let (_joey, token) = register_and_login(&app, "Joey", "joey@x.com").await;

    let (_, band) = send_json(
        &app,
        json_request("POST", "/bands", Some(&token), Some(json!({ "name": "Ramones" }))),
    )
    .await;
    let band_id = band["id"].as_i64().unwrap();

    send_json(
        &app,
        upload_request(&format!("/bands/{band_id}/upload"), &token, Some("demo"), b"bytes"),
    )
    .await;

    let (status, _) = send_json(
        &app,
        json_request("DELETE", &format!("/bands/{band_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!dir.path().join("Uploads").join("Ramones").exists());

    let (_, mine) = send_json(&app, json_request("GET", "/bands", Some(&token), None)).await;
    assert_eq!(mine, json!([]));

    let (status, _) = send_json(
        &app,
        json_request("GET", &format!("/bands/{band_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
