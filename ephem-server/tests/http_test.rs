/// Router tests driven through `tower::ServiceExt::oneshot`

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use ephem_api::Pastes;
use ephem_core::{
    Condition, ConditionalUpdate, Error as StoreError, Mutation, PasteId, PasteRecord,
    PasteStore, StoreStats,
};
use ephem_server::{metrics, request::TEST_NOW_HEADER, router, AppState, HttpSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const T0: i64 = 1_700_000_000_000;

fn app() -> Router {
    let settings = HttpSettings {
        base_url: None,
        test_mode: true,
        port: 5000,
    };
    router(AppState::new(Pastes::in_memory(), settings))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn post_json(body: Value, now_ms: i64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/pastes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "paste.test")
        .header(TEST_NOW_HEADER, now_ms.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, now_ms: i64) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(TEST_NOW_HEADER, now_ms.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router, body: Value) -> String {
    let (status, text) = send(app, post_json(body, T0)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", text);
    let created: Value = serde_json::from_str(&text).unwrap();
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_returns_id_and_url() {
    let app = app();
    let (status, text) = send(&app, post_json(json!({"content": "hello"}), T0)).await;
    assert_eq!(status, StatusCode::CREATED);

    let body: Value = serde_json::from_str(&text).unwrap();
    let id = body["id"].as_str().unwrap();
    assert!(id.len() >= 16);
    assert_eq!(body["url"], format!("http://paste.test/p/{}", id));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = app();
    for body in [
        json!({}),
        json!({"content": ""}),
        json!({"content": "x", "ttl_seconds": 0}),
        json!({"content": "x", "ttl_seconds": "10"}),
        json!({"content": "x", "max_views": -1}),
    ] {
        let (status, text) = send(&app, post_json(body.clone(), T0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        let err: Value = serde_json::from_str(&text).unwrap();
        assert!(err["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/pastes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, text) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(serde_json::from_str::<Value>(&text).unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_fetch_counts_views_and_reports_expiry() {
    let app = app();
    let id = create(&app, json!({"content": "secret", "ttl_seconds": 60, "max_views": 2})).await;
    let uri = format!("/api/pastes/{}", id);

    let (status, text) = send(&app, get(&uri, T0 + 1_000)).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(view["content"], "secret");
    assert_eq!(view["remaining_views"], 1);
    assert_eq!(view["expires_at"], "2023-11-14T22:14:20.000Z");

    let (status, text) = send(&app, get(&uri, T0 + 2_000)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap()["remaining_views"], 0);

    let (status, _) = send(&app, get(&uri, T0 + 3_000)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unlimited_paste_has_null_fields() {
    let app = app();
    let id = create(&app, json!({"content": "forever"})).await;

    let (status, text) = send(&app, get(&format!("/api/pastes/{}", id), T0)).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(view["remaining_views"], Value::Null);
    assert_eq!(view["expires_at"], Value::Null);
}

#[tokio::test]
async fn test_expired_paste_is_gone_at_deadline() {
    let app = app();
    let id = create(&app, json!({"content": "brief", "ttl_seconds": 10})).await;
    let uri = format!("/api/pastes/{}", id);

    let (status, _) = send(&app, get(&uri, T0 + 9_999)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get(&uri, T0 + 10_000)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_not_found_body_is_uniform() {
    let app = app();

    let expired = create(&app, json!({"content": "a", "ttl_seconds": 1})).await;
    let exhausted = create(&app, json!({"content": "b", "max_views": 1})).await;
    send(&app, get(&format!("/api/pastes/{}", exhausted), T0)).await;

    let mut bodies = Vec::new();
    for id in [expired.as_str(), exhausted.as_str(), "00112233445566ff", "not-an-id"] {
        let (status, text) = send(&app, get(&format!("/api/pastes/{}", id), T0 + 5_000)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        bodies.push(text);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert!(bodies[0].contains("Paste not found or no longer available"));
}

#[tokio::test]
async fn test_html_view_escapes_content() {
    let app = app();
    let id = create(&app, json!({"content": "<b>bold</b>\nline & more"})).await;

    let (status, page) = send(&app, get(&format!("/p/{}", id), T0)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("&lt;b&gt;bold&lt;/b&gt;<br>line &amp; more"));
    assert!(!page.contains("<b>bold</b>"));
}

#[tokio::test]
async fn test_html_view_consumes_a_view() {
    let app = app();
    let id = create(&app, json!({"content": "once", "max_views": 1})).await;

    let (status, _) = send(&app, get(&format!("/p/{}", id), T0)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = send(&app, get(&format!("/p/{}", id), T0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(page.contains("404 - Paste Not Found"));

    let (status, _) = send(&app, get(&format!("/api/pastes/{}", id), T0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_now_header_ignored_outside_test_mode() {
    let app = router(AppState::new(Pastes::in_memory(), HttpSettings::default()));
    let (status, text) = send(
        &app,
        post_json(json!({"content": "x", "ttl_seconds": 60}), 0),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = serde_json::from_str::<Value>(&text).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Created at the real clock, so a far-future header must not expire it
    let (status, _) = send(&app, get(&format!("/api/pastes/{}", id), i64::MAX / 2)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_configured_base_url() {
    let settings = HttpSettings {
        base_url: Some("https://paste.example.com".into()),
        ..HttpSettings::default()
    };
    let app = router(AppState::new(Pastes::in_memory(), settings));
    let (status, text) = send(&app, post_json(json!({"content": "x"}), T0)).await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert!(body["url"]
        .as_str()
        .unwrap()
        .starts_with("https://paste.example.com/p/"));
}

#[tokio::test]
async fn test_healthz() {
    let app = app();
    let (status, text) = send(&app, get("/api/healthz", T0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    metrics::register_metrics();
    let app = app();
    create(&app, json!({"content": "counted"})).await;

    let (status, text) = send(&app, get("/metrics", T0)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("ephem_pastes_created_total"));
    assert!(text.contains("ephem_http_requests_total"));
}

/// Store whose every operation fails
struct BrokenStore;

impl PasteStore for BrokenStore {
    fn insert(&self, _record: PasteRecord) -> ephem_core::Result<()> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
    fn get(&self, _id: &PasteId) -> ephem_core::Result<Option<PasteRecord>> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
    fn update_if(
        &self,
        _id: &PasteId,
        _condition: &Condition,
        _mutation: Mutation,
    ) -> ephem_core::Result<ConditionalUpdate> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
    fn stats(&self) -> ephem_core::Result<StoreStats> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
    fn ping(&self) -> ephem_core::Result<()> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
}

fn broken_app() -> Router {
    let settings = HttpSettings {
        test_mode: true,
        ..HttpSettings::default()
    };
    router(AppState::new(Pastes::with_store(Arc::new(BrokenStore)), settings))
}

#[tokio::test]
async fn test_store_failure_on_fetch_is_503() {
    let app = broken_app();
    let (status, text) = send(&app, get("/api/pastes/0011223344556677", T0)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert!(body["error"].is_string());
    assert!(!text.contains("disk gone"));
}

#[tokio::test]
async fn test_store_failure_on_create_is_503() {
    let app = broken_app();
    let (status, text) = send(&app, post_json(json!({"content": "x"}), T0)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(serde_json::from_str::<Value>(&text).unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_store_failure_on_page_is_error_page() {
    let app = broken_app();
    let (status, page) = send(&app, get("/p/0011223344556677", T0)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(page.contains("500 - Internal Server Error"));
}

#[tokio::test]
async fn test_store_failure_reports_unhealthy() {
    let app = broken_app();
    let (status, text) = send(&app, get("/api/healthz", T0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"ok": false}));
}

#[tokio::test]
async fn test_disk_backed_views_survive_restart() {
    let dir = TempDir::new().unwrap();
    let settings = HttpSettings {
        test_mode: true,
        ..HttpSettings::default()
    };

    let id = {
        let app = router(AppState::new(
            Pastes::open(dir.path()).unwrap(),
            settings.clone(),
        ));
        let id = create(&app, json!({"content": "persisted", "max_views": 2})).await;
        let (status, _) = send(&app, get(&format!("/api/pastes/{}", id), T0)).await;
        assert_eq!(status, StatusCode::OK);
        id
    };

    let app = router(AppState::new(Pastes::open(dir.path()).unwrap(), settings));
    let (status, text) = send(&app, get(&format!("/api/pastes/{}", id), T0)).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(view["content"], "persisted");
    assert_eq!(view["remaining_views"], 0);

    let (status, _) = send(&app, get(&format!("/api/pastes/{}", id), T0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
