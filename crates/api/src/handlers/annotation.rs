//! Handlers for diagram annotation with undo/redo.
//!
//! Each mutation updates the in-memory history and writes the visible
//! points back to the inspection, so a reload shows what the guest saw.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use cartcheck_core::diagram::{validate_point, DiagramData, Point, MAX_POINTS};
use cartcheck_core::error::CoreError;
use cartcheck_core::history::{AnnotationHistory, HistoryState};
use cartcheck_core::inspection::ensure_editable;
use cartcheck_core::types::InspectionId;
use cartcheck_db::repositories::InspectionRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::find_inspection;
use crate::middleware::admin::AdminAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Request / response types
   -------------------------------------------------------------------------- */

/// Points of one stroke, in drawing order.
#[derive(Debug, Deserialize)]
pub struct AddPoints {
    pub points: Vec<Point>,
}

/// History state after an operation.
#[derive(Debug, Serialize)]
pub struct AnnotationResult {
    #[serde(flatten)]
    pub state: HistoryState,
    /// Whether the operation changed anything; `false` for undo at the
    /// first step or redo without a redo tail.
    pub changed: bool,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// GET /inspections/{id}/diagram
///
/// Completed inspections return their final points with no history.
pub async fn get_diagram(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    let inspection = find_inspection(&state.pool, id).await?;
    let stored = inspection.diagram()?;
    let history = if inspection.is_completed() {
        AnnotationHistory::loaded(stored.points).state()
    } else {
        state.sessions.state(id, &stored).await
    };
    Ok(Json(DataResponse { data: history }))
}

/// POST /inspections/{id}/diagram/points
///
/// Each point becomes its own undo step.
pub async fn add_points(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
    Json(input): Json<AddPoints>,
) -> AppResult<impl IntoResponse> {
    if input.points.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "points must not be empty".into(),
        )));
    }
    for (i, point) in input.points.iter().enumerate() {
        validate_point(point)
            .map_err(|e| AppError::Core(CoreError::Validation(format!("points[{i}]: {e}"))))?;
    }

    let count = input.points.len();
    mutate(&state, id, "add_points", move |history| {
        if history.current().len() + input.points.len() > MAX_POINTS {
            return Err(CoreError::Validation(format!(
                "diagram cannot hold more than {MAX_POINTS} points"
            )));
        }
        for point in input.points {
            history.add_point(point);
        }
        Ok(true)
    })
    .await
    .inspect(|_| tracing::debug!(inspection_id = %id, count, "Diagram points added"))
}

/// POST /inspections/{id}/diagram/undo
pub async fn undo(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    mutate(&state, id, "undo", |history| Ok(history.undo())).await
}

/// POST /inspections/{id}/diagram/redo
pub async fn redo(
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    mutate(&state, id, "redo", |history| Ok(history.redo())).await
}

/// DELETE /inspections/{id}/diagram
///
/// Remove every marker, including pre-populated defaults.
pub async fn clear(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<InspectionId>,
) -> AppResult<impl IntoResponse> {
    mutate(&state, id, "clear", |history| {
        let changed = !history.is_empty() || history.len() > 1;
        history.clear();
        Ok(changed)
    })
    .await
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

/// Apply `op` to the inspection's history and persist the visible points.
///
/// The session stays locked until the write finishes; a failed write
/// rolls the history back.
async fn mutate(
    state: &AppState,
    id: InspectionId,
    op: &'static str,
    f: impl FnOnce(&mut AnnotationHistory) -> Result<bool, CoreError>,
) -> AppResult<Json<DataResponse<AnnotationResult>>> {
    let inspection = find_inspection(&state.pool, id).await?;
    ensure_editable(inspection.status()?)?;
    let stored = inspection.diagram()?;

    let mut session = state.sessions.lock(id, &stored).await;
    let before = AnnotationHistory::clone(&session);
    let changed = f(&mut *session)?;
    let history = session.state();

    if changed {
        let diagram = DiagramData::new(history.points.clone(), stored.diagram_type)
            .with_base_points(session.base_len());
        match InspectionRepo::update_diagram(&state.pool, id, &diagram).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Completed between the status check and the write.
                drop(session);
                state.sessions.remove(id).await;
                return Err(AppError::Core(CoreError::Conflict(
                    "Inspection has already been completed and can no longer be edited".into(),
                )));
            }
            Err(e) => {
                *session = before;
                return Err(e.into());
            }
        }
    }
    drop(session);

    tracing::debug!(
        inspection_id = %id,
        op,
        changed,
        step = history.step,
        points = history.points.len(),
        "Annotation updated"
    );

    Ok(Json(DataResponse {
        data: AnnotationResult {
            state: history,
            changed,
        },
    }))
}
