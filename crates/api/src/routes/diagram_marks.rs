use axum::routing::get;
use axum::Router;

use crate::handlers::diagram_mark;
use crate::state::AppState;

/// Default diagram mark routes, nested under `/diagram-marks`.
///
/// ```text
/// GET /                  list_diagram_marks (admin)
/// GET /{name}            get_diagram_marks
/// PUT /{name}            put_diagram_marks (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(diagram_mark::list_diagram_marks))
        .route(
            "/{name}",
            get(diagram_mark::get_diagram_marks).put(diagram_mark::put_diagram_marks),
        )
}
