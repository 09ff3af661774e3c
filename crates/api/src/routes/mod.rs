pub mod analysis;
pub mod auth;
pub mod health;
pub mod process;
pub mod reports;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                  login (public)
/// /auth/register                               register (admin only)
/// /auth/user                                   current user
/// /auth/logout                                 logout
///
/// /users                                       list (admin only)
/// /users/{id}                                  get, update (self or admin), delete (admin)
/// /users/{id}/settings                         get, update (self or admin)
///
/// /analysis                                    list, create
/// /analysis/{id}                               get, delete
/// /analysis/{id}/geojson                       detected features as GeoJSON
/// /analysis/{id}/images                        list, add
/// /analysis/{id}/images/{image_id}             get
///
/// /process/recent                              fetch + detect (form)
/// /process/upload                              upload + detect (multipart)
/// /process/temporal                            not implemented (501)
///
/// /reports/{id}                                download report
/// /reports/{id}/preview                        report preview
/// ```
///
/// Everything except `/auth/login` requires a Bearer token.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/analysis", analysis::router())
        .nest("/process", process::router(max_upload_bytes))
        .nest("/reports", reports::router())
}
