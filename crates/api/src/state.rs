use std::sync::Arc;

use satscan_core::detection::Detector;
use satscan_core::imagery::ImageSource;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: satscan_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Object detector run on every processed image.
    pub detector: Arc<dyn Detector>,
    /// Source of "recent" imagery for a coordinate.
    pub imagery: Arc<dyn ImageSource>,
}
