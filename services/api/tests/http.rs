//! services/api/tests/http.rs
//!
//! Drives the full router against an in-memory SQLite store.

use api_lib::{
    adapters::SqliteKeyValueStore,
    config::Config,
    web::{build_router, state::AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::future::join_all;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, Arc<AppState>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let kv = Arc::new(SqliteKeyValueStore::new(pool));
    kv.run_migrations().await.unwrap();

    let config = Arc::new(Config::from_lookup(|_| None).unwrap());
    let state = Arc::new(AppState::new(config, kv));
    (build_router(state.clone()), state)
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(app: &Router, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    Reply {
        status,
        headers,
        body,
    }
}

/// Signs in by e-mail and returns the `session=...` pair to send back.
async fn login(app: &Router, email: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "provider": "email", "email": email })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let set_cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

fn bundle() -> Value {
    json!({
        "publication": {
            "id": "ub",
            "title": "The Book",
            "familyId": "ub",
            "version": 1,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        },
        "documents": [
            {
                "id": "ub-paper-1",
                "type": "paper",
                "publicationId": "ub",
                "number": 1,
                "title": "The Universal Father",
                "sections": [{
                    "id": "ub-paper-1-s1",
                    "number": 1,
                    "title": "The Father's Name",
                    "paragraphs": [
                        { "id": "ub-paper-1-s1-p2", "number": 2, "text": "Second paragraph" },
                        { "id": "ub-paper-1-s1-p1", "number": 1, "text": "First paragraph" }
                    ]
                }]
            },
            {
                "id": "ub-paper-0",
                "type": "foreword",
                "publicationId": "ub",
                "number": 0,
                "title": "Foreword",
                "sections": [{
                    "id": "ub-paper-0-sI",
                    "number": "I",
                    "title": "Deity and Divinity",
                    "paragraphs": [{ "id": "ub-paper-0-sI-p1", "number": 1, "text": "Opening" }]
                }]
            }
        ]
    })
}

async fn seed(state: &AppState) {
    let bundle = bundle();
    let publication = serde_json::from_value(bundle["publication"].clone()).unwrap();
    let documents = serde_json::from_value(bundle["documents"].clone()).unwrap();
    assert!(state.content.import_publication(publication, documents).await);
}

//=========================================================================================
// Authentication
//=========================================================================================

#[tokio::test]
async fn login_me_and_logout() {
    let (app, _) = app().await;
    let cookie = login(&app, "Ada.Lovelace@Example.com").await;

    let me = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["userId"], "email:ada.lovelace@example.com");
    assert_eq!(me.json()["displayName"], "Ada Lovelace");

    let out = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(out.status, StatusCode::OK);
    assert!(out.headers[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let me = send(&app, Method::GET, "/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn email_login_requires_an_address() {
    let (app, _) = app().await;
    let reply = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "provider": "email" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_unknown_sessions() {
    let (app, _) = app().await;
    for cookie in [None, Some("session=not-a-session"), Some("theme=dark")] {
        let reply = send(&app, Method::GET, "/highlights", cookie, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "cookie {:?}", cookie);
    }
}

//=========================================================================================
// Content
//=========================================================================================

#[tokio::test]
async fn publications_import_export_and_delete() {
    let (app, _) = app().await;
    let cookie = login(&app, "editor@example.com").await;

    let unauthenticated = send(&app, Method::POST, "/publications/import", None, Some(bundle())).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);

    let imported = send(&app, Method::POST, "/publications/import", Some(&cookie), Some(bundle())).await;
    assert_eq!(imported.status, StatusCode::CREATED);
    let again = send(&app, Method::POST, "/publications/import", Some(&cookie), Some(bundle())).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let list = send(&app, Method::GET, "/publications", None, None).await;
    assert_eq!(list.json().as_array().unwrap().len(), 1);

    let latest = send(&app, Method::GET, "/publications/ub/latest", None, None).await;
    assert_eq!(latest.json()["id"], "ub");

    let export = send(&app, Method::GET, "/publications/ub/export", None, None).await;
    assert_eq!(export.status, StatusCode::OK);
    assert_eq!(export.json()["documents"].as_array().unwrap().len(), 2);

    let deleted = send(&app, Method::DELETE, "/publications/ub", Some(&cookie), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let export = send(&app, Method::GET, "/publications/ub/export", None, None).await;
    assert_eq!(export.status, StatusCode::NOT_FOUND);
    let documents = send(&app, Method::GET, "/documents", None, None).await;
    assert!(documents.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn documents_are_filtered_and_ordered() {
    let (app, state) = app().await;
    seed(&state).await;

    let all = send(&app, Method::GET, "/documents?publicationId=ub", None, None).await;
    let numbers: Vec<u64> = all
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![0, 1]);

    let forewords = send(&app, Method::GET, "/documents?type=foreword", None, None).await;
    let forewords = forewords.json();
    assert_eq!(forewords.as_array().unwrap().len(), 1);
    assert_eq!(forewords[0]["id"], "ub-paper-0");

    let paper = send(&app, Method::GET, "/documents/ub-paper-1", None, None).await;
    let paragraphs = &paper.json()["sections"][0]["paragraphs"];
    assert_eq!(paragraphs[0]["id"], "ub-paper-1-s1-p1");
    assert_eq!(paragraphs[1]["id"], "ub-paper-1-s1-p2");

    let missing = send(&app, Method::GET, "/documents/ub-paper-99", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paragraphs_can_be_added_edited_and_removed() {
    let (app, state) = app().await;
    seed(&state).await;
    let cookie = login(&app, "editor@example.com").await;
    let base = "/documents/ub-paper-1/sections/ub-paper-1-s1/paragraphs";

    let added = send(
        &app,
        Method::POST,
        base,
        Some(&cookie),
        Some(json!({ "id": "ub-paper-1-s1-p3", "number": 3, "text": "Third" })),
    )
    .await;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.json()["paragraphs"].as_array().unwrap().len(), 3);

    let duplicate = send(
        &app,
        Method::POST,
        base,
        Some(&cookie),
        Some(json!({ "id": "ub-paper-1-s1-p3", "number": 4, "text": "Again" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let uri = format!("{}/ub-paper-1-s1-p3", base);
    let edited = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&cookie),
        Some(json!({ "text": "Third, revised", "sectionId": "elsewhere" })),
    )
    .await;
    assert_eq!(edited.status, StatusCode::OK);
    let paragraph = send(&app, Method::GET, &uri, None, None).await.json();
    assert_eq!(paragraph["text"], "Third, revised");
    assert_eq!(paragraph["sectionId"], "ub-paper-1-s1");
    assert_eq!(paragraph["documentId"], "ub-paper-1");

    let removed = send(&app, Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let gone = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

//=========================================================================================
// Highlights
//=========================================================================================

fn highlight(color: &str, paragraph_id: &str) -> Value {
    json!({
        "text": "First",
        "color": color,
        "metadata": { "paperId": "ub-paper-1", "paragraphId": paragraph_id }
    })
}

#[tokio::test]
async fn highlights_are_stored_per_reader() {
    let (app, state) = app().await;
    seed(&state).await;
    let ada = login(&app, "ada@example.com").await;
    let bob = login(&app, "bob@example.com").await;

    let created = send(
        &app,
        Method::POST,
        "/highlights",
        Some(&ada),
        Some(highlight("yellow", "ub-paper-1-s1-p1")),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.json()["id"].as_str().unwrap().to_string();

    let mine = send(&app, Method::GET, "/highlights?paperId=ub-paper-1", Some(&ada), None).await;
    assert_eq!(mine.json().as_array().unwrap().len(), 1);
    let theirs = send(&app, Method::GET, "/highlights", Some(&bob), None).await;
    assert!(theirs.json().as_array().unwrap().is_empty());

    let uri = format!("/highlights/{}", id);
    let recolored = send(&app, Method::PATCH, &uri, Some(&ada), Some(json!({ "color": "green" }))).await;
    assert_eq!(recolored.json()["color"], "green");

    let foreign = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    let deleted = send(&app, Method::DELETE, &uri, Some(&ada), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn concurrent_writes_from_one_reader_are_all_kept() {
    let (app, state) = app().await;
    seed(&state).await;
    let cookie = login(&app, "ada@example.com").await;

    let creates = (0..8).map(|_| {
        send(
            &app,
            Method::POST,
            "/highlights",
            Some(&cookie),
            Some(highlight("blue", "ub-paper-1-s1-p1")),
        )
    });
    for reply in join_all(creates).await {
        assert_eq!(reply.status, StatusCode::CREATED);
    }
    let stored = send(&app, Method::GET, "/highlights", Some(&cookie), None).await.json();
    assert_eq!(stored.as_array().unwrap().len(), 8);

    let visits = (0..6).map(|n| {
        send(
            &app,
            Method::POST,
            "/history",
            Some(&cookie),
            Some(json!({ "paperId": format!("ub-paper-{}", n), "title": "Visited" })),
        )
    });
    join_all(visits).await;
    let history = send(&app, Method::GET, "/history", Some(&cookie), None).await.json();
    assert_eq!(history.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn invalid_highlights_are_rejected() {
    let (app, state) = app().await;
    seed(&state).await;
    let cookie = login(&app, "ada@example.com").await;

    let none = send(
        &app,
        Method::POST,
        "/highlights",
        Some(&cookie),
        Some(highlight("none", "ub-paper-1-s1-p1")),
    )
    .await;
    assert_eq!(none.status, StatusCode::BAD_REQUEST);

    let orphan = send(
        &app,
        Method::POST,
        "/highlights",
        Some(&cookie),
        Some(highlight("blue", "ub-paper-1-s1-p9")),
    )
    .await;
    assert_eq!(orphan.status, StatusCode::NOT_FOUND);

    let list = send(&app, Method::GET, "/highlights", Some(&cookie), None).await;
    assert!(list.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stylesheet_is_public_css() {
    let (app, _) = app().await;
    let reply = send(&app, Method::GET, "/highlights/styles.css", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    let css = String::from_utf8(reply.body).unwrap();
    assert!(css.contains("background-color"));
}

//=========================================================================================
// Reader State
//=========================================================================================

#[tokio::test]
async fn history_moves_revisits_to_the_front() {
    let (app, _) = app().await;
    let cookie = login(&app, "ada@example.com").await;

    for (paper_id, title) in [("ub-paper-1", "One"), ("ub-paper-2", "Two"), ("ub-paper-1", "One")] {
        let reply = send(
            &app,
            Method::POST,
            "/history",
            Some(&cookie),
            Some(json!({ "paperId": paper_id, "title": title })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let history = send(&app, Method::GET, "/history", Some(&cookie), None).await.json();
    let ids: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["paperId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ub-paper-1", "ub-paper-2"]);

    let removed = send(&app, Method::DELETE, "/history/ub-paper-2", Some(&cookie), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let missing = send(&app, Method::DELETE, "/history/ub-paper-2", Some(&cookie), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let cleared = send(&app, Method::DELETE, "/history", Some(&cookie), None).await;
    assert_eq!(cleared.status, StatusCode::NO_CONTENT);
    let history = send(&app, Method::GET, "/history", Some(&cookie), None).await.json();
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn preferences_merge_clamp_and_reset() {
    let (app, _) = app().await;
    let cookie = login(&app, "ada@example.com").await;

    let defaults = send(&app, Method::GET, "/preferences", Some(&cookie), None).await.json();
    assert_eq!(defaults["fontSize"], 16);

    let updated = send(
        &app,
        Method::PUT,
        "/preferences",
        Some(&cookie),
        Some(json!({ "fontSize": 40, "theme": "dark", "tts": { "rate": 1.5 } })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    let updated = updated.json();
    assert_eq!(updated["fontSize"], 32);
    assert_eq!(updated["theme"], "dark");
    assert_eq!(updated["tts"]["rate"], 1.5);
    assert_eq!(updated["tts"]["pitch"], 1.0);

    let stored = send(&app, Method::GET, "/preferences", Some(&cookie), None).await.json();
    assert_eq!(stored, updated);

    let oversized = send(
        &app,
        Method::PUT,
        "/preferences",
        Some(&cookie),
        Some(json!({ "fontSize": 300 })),
    )
    .await;
    assert_eq!(oversized.status, StatusCode::OK);
    assert_eq!(oversized.json()["fontSize"], 32);

    let rejected = send(
        &app,
        Method::PUT,
        "/preferences",
        Some(&cookie),
        Some(json!({ "theme": 7 })),
    )
    .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let reset = send(&app, Method::DELETE, "/preferences", Some(&cookie), None).await.json();
    assert_eq!(reset, defaults);
}
