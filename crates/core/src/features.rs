//! Per-user detection feature toggles.

use serde::{Deserialize, Serialize};

/// Which object classes a detection run should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub runways: bool,
    pub aircraft: bool,
    pub houses: bool,
    pub roads: bool,
    pub water_bodies: bool,
}

impl FeatureSet {
    /// Every feature enabled (the default for new users).
    pub const fn all() -> Self {
        Self {
            runways: true,
            aircraft: true,
            houses: true,
            roads: true,
            water_bodies: true,
        }
    }

    /// Every feature disabled.
    pub const fn none() -> Self {
        Self {
            runways: false,
            aircraft: false,
            houses: false,
            roads: false,
            water_bodies: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}
