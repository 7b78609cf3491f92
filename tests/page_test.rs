//! HTTP page tests.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::Unmarshalable;
use logz::core::{Config, ConfigBuilder};
use logz::observer::Observer;
use logz::page;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn named(name: &str, max_cardinality: u32) -> Arc<Observer> {
    Arc::new(Observer::new(
        ConfigBuilder::new()
            .name(name)
            .max_cardinality(max_cardinality)
            .build()
            .unwrap(),
    ))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_lists_entries_sorted() {
    let info = named("INFO", 10);
    info.observe_message("zebra", ());
    info.observe_message("alpha", ());
    info.observe_message("alpha", ());

    let response = get(page::router(vec![info]).unwrap(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    let alpha = html.find(">alpha</a>").unwrap();
    let zebra = html.find(">zebra</a>").unwrap();
    assert!(alpha < zebra);
    assert!(html.contains("<td>2</td>"));
    assert!(html.contains("<div class=\"hist\">"));
    assert!(!html.contains("Other Messages"));
    assert!(!html.contains("id=\"samples\""));
}

#[tokio::test]
async fn test_empty_observer() {
    let response = get(page::router(vec![Arc::new(Observer::default())]).unwrap(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("no rows"));
}

#[tokio::test]
async fn test_level_selection() {
    let info = named("INFO", 10);
    let warn = named("WARN", 10);
    info.observe_message("info only", ());
    warn.observe_message("warn only", ());

    let app = page::router(vec![info, warn]).unwrap();

    let html = body_text(get(app.clone(), "/?level=WARN").await).await;
    assert!(html.contains("warn only"));
    assert!(!html.contains("info only"));
    assert!(html.contains("<a href=\"?level=WARN\" class=\"selected\">WARN</a>"));

    // Unknown level falls back to the first observer
    let html = body_text(get(app, "/?level=TRACE").await).await;
    assert!(html.contains("info only"));
}

#[tokio::test]
async fn test_message_details() {
    let info = named("INFO", 10);
    info.observe_message("user <b>logged</b> in", json!({"name": "a&b"}));

    let app = page::router(vec![info]).unwrap();
    let html = body_text(get(app, "/?msg=user%20%3Cb%3Elogged%3C%2Fb%3E%20in").await).await;

    assert!(html.contains("<h2>user &lt;b&gt;logged&lt;/b&gt; in</h2>"));
    assert!(html.contains("id=\"samples\""));
    assert!(html.contains("&#34;name&#34;: &#34;a&amp;b&#34;"));
    assert!(!html.contains("<b>logged</b>"));
}

#[tokio::test]
async fn test_other_messages() {
    let info = named("INFO", 1);
    info.observe_message("admitted", ());
    info.observe_message("grouped one", 1);
    info.observe_message("grouped two", 2);

    let app = page::router(vec![info]).unwrap();

    let html = body_text(get(app.clone(), "/").await).await;
    assert!(html.contains("Other Messages"));
    assert!(!html.contains("grouped one"));

    let html = body_text(get(app, "/?other=1").await).await;
    assert!(html.contains("<h2>Other Messages</h2>"));
    assert!(html.contains("grouped one"));
    assert!(html.contains("grouped two"));
}

#[tokio::test]
async fn test_json_format() {
    let warn = named("WARN", 10);
    warn.observe_message("disk full", json!({"free": 0}));

    let app = page::router(vec![warn]).unwrap();
    let response = get(app, "/?format=json&msg=disk%20full").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(value["level"], "WARN");
    assert_eq!(value["levels"], json!(["WARN"]));
    assert_eq!(value["entries"][0]["message"], "disk full");
    assert_eq!(value["entries"][0]["count"], 1);
    assert_eq!(value["details"]["samples"][0]["data"], json!({"free": 0}));
    assert_eq!(value["other"]["count"], 0);
}

#[tokio::test]
async fn test_marshal_failure_is_server_error() {
    let error = named("ERROR", 10);
    error.observe_message("broken", Unmarshalable);

    let app = page::router(vec![error]).unwrap();

    // The listing never marshals payloads
    assert_eq!(get(app.clone(), "/").await.status(), StatusCode::OK);

    let response = get(app.clone(), "/?msg=broken").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("refusing to marshal"));

    let response = get(app, "/?msg=broken&format=json").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_requires_observers() {
    assert!(page::router(Vec::new()).is_err());
}

#[test]
fn test_unnamed_observers_not_listed_as_levels() {
    let unnamed = Arc::new(Observer::new(Config::default()));
    assert!(page::router(vec![unnamed]).is_ok());
}
