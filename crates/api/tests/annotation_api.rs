//! HTTP-level tests for diagram annotation with undo/redo.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, point, post_empty, post_json, SIGNATURE_PNG};
use sqlx::PgPool;

async fn add(app: &common::TestApp, id: &str, points: Vec<serde_json::Value>) -> serde_json::Value {
    let response = post_json(
        app.router(),
        &format!("/api/v1/inspections/{id}/diagram/points"),
        serde_json::json!({ "points": points }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn each_point_is_an_undo_step(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();

    let state = add(&app, id, vec![point(10.0, 10.0), point(20.0, 20.0)]).await;
    assert_eq!(state["step"], 2);
    assert_eq!(state["total_steps"], 3);
    assert_eq!(state["can_undo"], true);
    assert_eq!(state["can_redo"], false);

    let undo_uri = format!("/api/v1/inspections/{id}/diagram/undo");
    let json = body_json(post_empty(app.router(), &undo_uri).await).await;
    assert_eq!(json["data"]["changed"], true);
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["can_redo"], true);

    let redo_uri = format!("/api/v1/inspections/{id}/diagram/redo");
    let json = body_json(post_empty(app.router(), &redo_uri).await).await;
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 2);

    // The visible points are persisted on the inspection.
    let json = body_json(get(app.router(), &format!("/api/v1/inspections/{id}")).await).await;
    assert_eq!(
        json["data"]["diagram_data"]["points"].as_array().unwrap().len(),
        2
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn drawing_after_undo_discards_redo_tail(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();

    add(&app, id, vec![point(10.0, 10.0), point(20.0, 20.0)]).await;
    post_empty(app.router(), &format!("/api/v1/inspections/{id}/diagram/undo")).await;

    let state = add(&app, id, vec![point(30.0, 30.0)]).await;
    assert_eq!(state["can_redo"], false);
    assert_eq!(state["points"][1]["x"], 30.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn undo_at_first_step_changes_nothing(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = post_empty(app.router(), &format!("/api/v1/inspections/{id}/diagram/undo")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["changed"], false);
    assert_eq!(json["data"]["step"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn clear_removes_every_marker(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();
    add(&app, id, vec![point(10.0, 10.0)]).await;

    let uri = format!("/api/v1/inspections/{id}/diagram");
    let json = body_json(delete(app.router(), &uri).await).await;
    assert_eq!(json["data"]["changed"], true);
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 0);
    assert_eq!(json["data"]["can_undo"], false);

    let json = body_json(get(app.router(), &uri).await).await;
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_points_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let uri = format!(
        "/api/v1/inspections/{}/diagram/points",
        created["id"].as_str().unwrap()
    );

    let response = post_json(app.router(), &uri, serde_json::json!({ "points": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.router(),
        &uri,
        serde_json::json!({ "points": [point(10.0, -1.0)] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("points[0]"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn completed_inspection_is_read_only(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();
    add(&app, id, vec![point(10.0, 10.0), point(20.0, 20.0)]).await;

    let response = post_json(
        app.router(),
        &format!("/api/v1/inspections/{id}/complete"),
        serde_json::json!({ "signature_data": SIGNATURE_PNG }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Submitted without explicit points: the annotated state is kept.
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["inspection"]["diagram_data"]["points"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    let response = post_empty(app.router(), &format!("/api/v1/inspections/{id}/diagram/undo")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(get(app.router(), &format!("/api/v1/inspections/{id}/diagram")).await).await;
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["can_undo"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reading_the_diagram_does_not_open_a_session(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();

    let response = get(app.router(), &format!("/api/v1/inspections/{id}/diagram")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.sessions.is_empty().await);

    add(&app, id, vec![point(10.0, 10.0)]).await;
    assert_eq!(app.sessions.len().await, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_edits_store_the_final_session_state(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap().to_string();
    add(&app, &id, vec![point(10.0, 10.0), point(20.0, 20.0)]).await;

    let mut tasks = Vec::new();
    for i in 0..24 {
        let router = app.router();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            let uri = match i % 3 {
                0 => format!("/api/v1/inspections/{id}/diagram/points"),
                1 => format!("/api/v1/inspections/{id}/diagram/undo"),
                _ => format!("/api/v1/inspections/{id}/diagram/redo"),
            };
            let body = (i % 3 == 0).then(|| {
                serde_json::json!({ "points": [point(30.0 + i as f64, 40.0)] })
            });
            let response =
                common::send(router, axum::http::Method::POST, &uri, body, None).await;
            assert_eq!(response.status(), StatusCode::OK);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let session = body_json(get(app.router(), &format!("/api/v1/inspections/{id}/diagram")).await).await;
    let stored = body_json(get(app.router(), &format!("/api/v1/inspections/{id}")).await).await;
    assert_eq!(
        stored["data"]["diagram_data"]["points"],
        session["data"]["points"]
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn default_marks_cannot_be_undone(pool: PgPool) {
    let app = common::build_test_app(pool);
    common::put_json(
        app.router(),
        "/api/v1/diagram-marks/rental_150",
        serde_json::json!({ "points": [point(5.0, 5.0), point(6.0, 6.0)] }),
    )
    .await;
    let created = common::create_inspection(&app).await;
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["diagram_data"]["basePoints"], 2);

    add(&app, id, vec![point(10.0, 10.0)]).await;

    let undo_uri = format!("/api/v1/inspections/{id}/diagram/undo");
    let json = body_json(post_empty(app.router(), &undo_uri).await).await;
    assert_eq!(json["data"]["changed"], true);
    let json = body_json(post_empty(app.router(), &undo_uri).await).await;
    assert_eq!(json["data"]["changed"], false);
    assert_eq!(json["data"]["points"].as_array().unwrap().len(), 2);

    // A fresh session rebuilt from storage keeps the same floor.
    app.sessions.remove(id.parse().unwrap()).await;
    let json = body_json(get(app.router(), &format!("/api/v1/inspections/{id}/diagram")).await).await;
    assert_eq!(json["data"]["can_undo"], false);
}
