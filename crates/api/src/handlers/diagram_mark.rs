//! Handlers for default diagram marks.
//!
//! Marks are keyed by diagram name without the image extension, so
//! `rental_150.jpg` and `rental_150` address the same row.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cartcheck_core::diagram::{dedupe_points, normalize_diagram_name, validate_points, Point};
use cartcheck_core::error::CoreError;
use cartcheck_db::models::diagram_mark::UpsertDiagramMarks;
use cartcheck_db::repositories::DiagramMarkRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::admin::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DiagramMarksView {
    pub diagram_name: String,
    pub points: Vec<Point>,
}

/// GET /diagram-marks
pub async fn list_diagram_marks(
    _admin: AdminAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let marks = DiagramMarkRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: marks }))
}

/// GET /diagram-marks/{name}
///
/// A diagram without stored marks has an empty point list.
pub async fn get_diagram_marks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let diagram_name = normalize_diagram_name(&name).to_string();
    let points = state.mark_cache.get(&state.pool, &diagram_name).await?;
    Ok(Json(DataResponse {
        data: DiagramMarksView {
            diagram_name,
            points,
        },
    }))
}

/// PUT /diagram-marks/{name}
///
/// Replace the default marks of a diagram. Duplicate `(x, y, color)`
/// markers are collapsed, keeping the last one. Responds 201 when the
/// diagram had no marks before.
pub async fn put_diagram_marks(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<UpsertDiagramMarks>,
) -> AppResult<impl IntoResponse> {
    let diagram_name = normalize_diagram_name(name.trim());
    if diagram_name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "diagram name is required".into(),
        )));
    }
    validate_points(&input.points)?;

    let submitted = input.points.len();
    let points = dedupe_points(input.points);
    let json = serde_json::to_value(&points)
        .map_err(|e| AppError::InternalError(format!("Failed to encode points: {e}")))?;

    let (mark, inserted) = DiagramMarkRepo::upsert(&state.pool, diagram_name, &json).await?;
    state.mark_cache.put(diagram_name, points).await;

    tracing::info!(
        diagram_name,
        submitted,
        stored = mark.points.as_array().map_or(0, Vec::len),
        inserted,
        "Diagram marks saved"
    );

    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: mark })))
}
