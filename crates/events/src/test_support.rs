//! Throw-away HTTP servers standing in for third-party APIs.

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, Method, Uri};
use axum::Router;

/// A request body captured by a fake endpoint.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub uri: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

pub type Log = Arc<Mutex<Vec<Captured>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &Log, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) {
    log.lock().unwrap().push(Captured {
        method: method.to_string(),
        uri: uri.to_string(),
        authorization: headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
    });
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fake Resend endpoint failing the first `failures` requests with 500.
///
/// Returns the endpoint URL and the request log.
pub async fn fake_resend(failures: usize) -> (String, Log) {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Json;

    let log = new_log();
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/emails",
            post(
                move |State((log, calls)): State<(Log, Arc<AtomicUsize>)>,
                      method: Method,
                      uri: Uri,
                      headers: HeaderMap,
                      body: Bytes| async move {
                    record(&log, &method, &uri, &headers, &body);
                    if calls.fetch_add(1, Ordering::SeqCst) < failures {
                        return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({})));
                    }
                    (StatusCode::OK, Json(serde_json::json!({ "id": "email_123" })))
                },
            ),
        )
        .with_state((log.clone(), calls));
    let base = spawn(app).await;
    (format!("{base}/emails"), log)
}
