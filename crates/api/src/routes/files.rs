use axum::routing::get;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Local storage objects, mounted at the root next to `/health`.
///
/// ```text
/// GET /files/{bucket}/{*key}
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/files/{bucket}/{*key}", get(files::get_file))
}
