use axum::routing::post;
use axum::Router;

use crate::handlers::email;
use crate::state::AppState;

/// ```text
/// POST /send-email       send_email
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/send-email", post(email::send_email))
}
