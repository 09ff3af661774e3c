//! Analysis image entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use satscan_core::types::{DbId, Timestamp};

/// A row from the `analysis_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisImage {
    pub id: DbId,
    pub analysis_id: DbId,
    pub image_date: Option<Timestamp>,
    pub processing_date: Option<Timestamp>,
    pub image_path: Option<String>,
    pub ppt_path: Option<String>,
    pub runway_detected: bool,
    pub runway_length: Option<f64>,
    pub runway_width: Option<f64>,
    pub aircraft_count: i32,
    pub house_count: i32,
    pub road_count: i32,
    pub water_body_count: i32,
    pub geojson_data: Option<serde_json::Value>,
    pub status: String,
    pub source_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AnalysisImage {
    /// True when no processing or detection has ever been recorded.
    pub fn is_untouched(&self) -> bool {
        self.processing_date.is_none()
            && self.geojson_data.is_none()
            && !self.runway_detected
            && self.aircraft_count == 0
            && self.house_count == 0
            && self.road_count == 0
            && self.water_body_count == 0
    }

    /// On-disk artifacts referenced by this image.
    pub fn artifact_paths(&self) -> impl Iterator<Item = &str> {
        self.image_path
            .as_deref()
            .into_iter()
            .chain(self.ppt_path.as_deref())
    }
}

/// DTO for attaching an image record to an analysis.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAnalysisImage {
    pub analysis_id: DbId,
    pub image_date: Option<Timestamp>,
    pub image_path: Option<String>,
    /// Defaults to `pending`.
    pub status: Option<String>,
    /// Defaults to `api`.
    pub source_type: Option<String>,
}
