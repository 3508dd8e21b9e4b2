pub mod diagram_marks;
pub mod email;
pub mod files;
pub mod health;
pub mod inspections;
pub mod properties;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /properties                                  list catalog
/// /properties/{id}                             get property
/// /properties/{id}/diagram                     diagram URL + default marks
///
/// /diagram-marks                               list (admin)
/// /diagram-marks/{name}                        get, replace (admin)
///
/// /inspections                                 list (admin), create (admin)
/// /inspections/{id}                            guest view load
/// /inspections/{id}/complete                   sign and submit (POST)
/// /inspections/{id}/pdf                        signed PDF download
/// /inspections/{id}/diagram                    history state, clear (admin, DELETE)
/// /inspections/{id}/diagram/points             add stroke points (POST)
/// /inspections/{id}/diagram/undo               undo (POST)
/// /inspections/{id}/diagram/redo               redo (POST)
///
/// /send-email                                  email proxy (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/properties", properties::router())
        .nest("/diagram-marks", diagram_marks::router())
        .nest("/inspections", inspections::router())
        .merge(email::router())
}
