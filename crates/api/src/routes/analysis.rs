//! Route definitions for the `/analysis` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::analysis;
use crate::state::AppState;

/// Routes mounted at `/analysis`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// DELETE /{id}                      -> delete
/// GET    /{id}/geojson              -> geojson
/// GET    /{id}/images               -> list_images
/// POST   /{id}/images               -> add_image
/// GET    /{id}/images/{image_id}    -> get_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(analysis::list).post(analysis::create))
        .route("/{id}", get(analysis::get_by_id).delete(analysis::delete))
        .route("/{id}/geojson", get(analysis::geojson))
        .route(
            "/{id}/images",
            get(analysis::list_images).post(analysis::add_image),
        )
        .route("/{id}/images/{image_id}", get(analysis::get_image))
}
