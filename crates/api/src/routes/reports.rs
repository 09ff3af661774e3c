//! Route definitions for the `/reports` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::reports;
use crate::state::AppState;

/// Routes mounted at `/reports`.
///
/// ```text
/// GET /{id}           -> download
/// GET /{id}/preview   -> preview
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(reports::download))
        .route("/{id}/preview", get(reports::preview))
}
