//! Route definitions for the `/process` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::process;
use crate::state::AppState;

/// Routes mounted at `/process`.
///
/// ```text
/// POST /recent     -> recent
/// POST /upload     -> upload (body limited to `max_upload_bytes`)
/// POST /temporal   -> temporal
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recent", post(process::recent))
        .route(
            "/upload",
            post(process::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/temporal", post(process::temporal))
}
