//! HTTP-level tests for the email proxy.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, post_json, send, ADMIN_KEY};
use sqlx::PgPool;

fn request() -> serde_json::Value {
    serde_json::json!({
        "guestName": "Ana Rivera",
        "guestEmail": "ana@example.com",
        "property": "Rental #150",
        "inspectionDate": "2025-04-09",
        "formLink": "http://localhost:5173/inspection/abc",
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn guest_form_goes_to_the_guest(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app.router(), "/api/v1/send-email", request()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["message"], "Email sent");
    assert_eq!(json["data"]["recipients"], serde_json::json!(["ana@example.com"]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_alert_uses_configured_admins(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut body = request();
    body["adminAlert"] = true.into();

    let json = body_json(post_json(app.router(), "/api/v1/send-email", body).await).await;
    assert_eq!(
        json["data"]["recipients"],
        serde_json::json!(["admin@example.com"])
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn completed_form_copy_honours_admin_override(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut body = request();
    body["type"] = "completed-form".into();
    body["isAdmin"] = true.into();
    body["adminEmails"] = serde_json::json!(["ops@example.com"]);
    body["pdfBase64"] = "data:application/pdf;base64,JVBERi0xLjQ=".into();

    let json = body_json(post_json(app.router(), "/api/v1/send-email", body).await).await;
    assert_eq!(json["data"]["recipients"], serde_json::json!(["ops@example.com"]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_fields_are_reported(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app.router(),
        "/api/v1/send-email",
        serde_json::json!({ "guestName": "Ana Rivera" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Missing required fields: guestEmail, property"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn malformed_diagram_points_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut body = request();
    body["diagramPoints"] = serde_json::json!([{ "x": 1, "y": 2 }, { "x": "a" }]);

    let response = post_json(app.router(), "/api/v1/send-email", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_override_needs_the_admin_key(pool: PgPool) {
    let app = common::build_test_app_with_admin_key(pool);
    let uri = "/api/v1/send-email";
    let mut body = request();
    body["adminAlert"] = true.into();
    body["adminEmails"] = serde_json::json!(["attacker@example.com"]);

    let response = send(app.router(), Method::POST, uri, Some(body.clone()), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(app.router(), Method::POST, uri, Some(body), Some(ADMIN_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["recipients"],
        serde_json::json!(["attacker@example.com"])
    );

    // Without an override the proxy stays open.
    let response = post_json(app.router(), uri, request()).await;
    assert_eq!(response.status(), StatusCode::OK);
}
