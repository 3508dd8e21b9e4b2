use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{annotation, inspection};
use crate::state::AppState;

/// Inspection routes, nested under `/inspections`.
///
/// ```text
/// GET    /                          list_inspections (admin)
/// POST   /                          create_inspection (admin)
/// GET    /{id}                      get_inspection
/// POST   /{id}/complete             complete_inspection
/// GET    /{id}/pdf                  download_pdf
/// GET    /{id}/diagram              get_diagram
/// DELETE /{id}/diagram              clear (admin)
/// POST   /{id}/diagram/points       add_points
/// POST   /{id}/diagram/undo         undo
/// POST   /{id}/diagram/redo         redo
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(inspection::list_inspections).post(inspection::create_inspection),
        )
        .route("/{id}", get(inspection::get_inspection))
        .route("/{id}/complete", post(inspection::complete_inspection))
        .route("/{id}/pdf", get(inspection::download_pdf))
        .route(
            "/{id}/diagram",
            get(annotation::get_diagram).delete(annotation::clear),
        )
        .route("/{id}/diagram/points", post(annotation::add_points))
        .route("/{id}/diagram/undo", post(annotation::undo))
        .route("/{id}/diagram/redo", post(annotation::redo))
}
