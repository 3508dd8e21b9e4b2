//! Shared helpers for HTTP-level integration tests.
//!
//! Requests go straight to the router through `tower::ServiceExt::oneshot`,
//! without a TCP listener.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use cartcheck_api::annotation::{AnnotationSessions, DiagramMarkCache};
use cartcheck_api::config::{ServerConfig, StorageConfig};
use cartcheck_api::router::build_app_router;
use cartcheck_api::state::AppState;
use cartcheck_api::storage::LocalStorage;
use cartcheck_events::{EmailConfig, EmailDelivery, EventBus, NotificationConfig};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

/// 2x2 PNG, used as a drawn signature.
pub const SIGNATURE_PNG: &str = "data:image/png;base64,\
    iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAIAAAD91JpzAAAADklEQVR4nGNggID/YAAAFPkF+8gKqE8AAAAASUVORK5CYII=";

pub const ADMIN_KEY: &str = "test-admin-key";

/// A router plus the directory backing its local storage.
///
/// The annotation sessions live in the router's state, so tests that
/// undo/redo must keep sending requests to clones of the same router.
pub struct TestApp {
    pub router: Router,
    pub event_bus: Arc<EventBus>,
    pub sessions: Arc<AnnotationSessions>,
    pub mark_cache: Arc<DiagramMarkCache>,
    pub files: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage_root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        public_base_url: "http://localhost:5173".to_string(),
        admin_api_key: None,
        storage: StorageConfig::Local {
            root: storage_root.to_path_buf(),
            public_url: "http://localhost:3000/files".to_string(),
        },
    }
}

/// Build the full application router with admin routes open.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_with(pool, None)
}

/// Build the full application router with admin routes guarded by
/// [`ADMIN_KEY`].
pub fn build_test_app_with_admin_key(pool: PgPool) -> TestApp {
    build_with(pool, Some(ADMIN_KEY.to_string()))
}

fn build_with(pool: PgPool, admin_api_key: Option<String>) -> TestApp {
    let files = tempfile::tempdir().unwrap();
    let mut config = test_config(files.path());
    config.admin_api_key = admin_api_key;

    let event_bus = Arc::new(EventBus::default());
    let sessions = Arc::new(AnnotationSessions::new());
    let mark_cache = Arc::new(DiagramMarkCache::new());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        storage: Arc::new(LocalStorage::new(
            files.path().to_path_buf(),
            "http://localhost:3000/files".to_string(),
        )),
        sessions: Arc::clone(&sessions),
        mark_cache: Arc::clone(&mark_cache),
        email: Arc::new(EmailDelivery::new(EmailConfig::log_only()).unwrap()),
        notifications: Arc::new(NotificationConfig {
            created_admins: vec!["admin@example.com".to_string()],
            completed_admins: vec!["admin@example.com".to_string()],
        }),
    };

    TestApp {
        router: build_app_router(state, &config),
        event_bus,
        sessions,
        mark_cache,
        files,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    admin_key: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = admin_key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None, None).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None, None).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn new_inspection_body() -> serde_json::Value {
    serde_json::json!({
        "guest_name": "Ana Rivera",
        "guest_email": "ana@example.com",
        "guest_phone": "555-0100",
        "inspection_date": "2025-04-09",
        "property": "Rental #150",
    })
}

/// Create an inspection and return its `data` object.
pub async fn create_inspection(app: &TestApp) -> serde_json::Value {
    let response = post_json(app.router(), "/api/v1/inspections", new_inspection_body()).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

pub fn point(x: f64, y: f64) -> serde_json::Value {
    serde_json::json!({ "x": x, "y": y, "color": "#ff0000", "size": 12.0 })
}
