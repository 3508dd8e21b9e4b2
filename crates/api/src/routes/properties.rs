use axum::routing::get;
use axum::Router;

use crate::handlers::property;
use crate::state::AppState;

/// Property catalog routes, nested under `/properties`.
///
/// ```text
/// GET /                  list_properties
/// GET /{id}              get_property
/// GET /{id}/diagram      get_property_diagram
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(property::list_properties))
        .route("/{id}", get(property::get_property))
        .route("/{id}/diagram", get(property::get_property_diagram))
}
