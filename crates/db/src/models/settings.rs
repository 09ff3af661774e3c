//! Per-user detection settings.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use satscan_core::features::FeatureSet;
use satscan_core::types::{DbId, Timestamp};

/// A row from the `analysis_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisSettings {
    pub id: DbId,
    pub user_id: DbId,
    pub detect_runways: bool,
    pub detect_aircraft: bool,
    pub detect_houses: bool,
    pub detect_roads: bool,
    pub detect_water_bodies: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AnalysisSettings {
    /// The feature flags a detection run should honour.
    pub fn features(&self) -> FeatureSet {
        FeatureSet {
            runways: self.detect_runways,
            aircraft: self.detect_aircraft,
            houses: self.detect_houses,
            roads: self.detect_roads,
            water_bodies: self.detect_water_bodies,
        }
    }
}

/// Partial settings update. `None` keeps the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettings {
    pub detect_runways: Option<bool>,
    pub detect_aircraft: Option<bool>,
    pub detect_houses: Option<bool>,
    pub detect_roads: Option<bool>,
    pub detect_water_bodies: Option<bool>,
}
