use super::{Detection, DetectionError, DetectionResult, Detector, PixelGeometry};
use crate::features::FeatureSet;

/// Detector that ignores the image and reports a fixed layout.
///
/// Useful wherever output must be predictable: integration tests and
/// offline demos. Disabled features are still honoured.
#[derive(Debug, Clone)]
pub struct FixedDetector {
    pub width: u32,
    pub height: u32,
    pub runway: bool,
    pub aircraft: u32,
    pub houses: u32,
    pub roads: u32,
    pub water_bodies: u32,
}

impl Default for FixedDetector {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            runway: true,
            aircraft: 3,
            houses: 2,
            roads: 3,
            water_bodies: 1,
        }
    }
}

fn object(id: u32, geometry: PixelGeometry) -> Detection {
    Detection {
        id,
        confidence: 0.9,
        geometry,
        width_px: None,
        area_px: None,
    }
}

impl Detector for FixedDetector {
    fn detect(&self, _image: &[u8], features: &FeatureSet) -> Result<DetectionResult, DetectionError> {
        let mut result = DetectionResult::empty(self.width, self.height);
        let w = f64::from(self.width);
        let h = f64::from(self.height);

        if features.runways && self.runway {
            result.runways.push(object(
                1,
                PixelGeometry::Box([0.1 * w, 0.45 * h, 0.9 * w, 0.55 * h]),
            ));
        }
        if features.aircraft {
            result.aircraft = (1..=self.aircraft)
                .map(|i| {
                    let x = w * f64::from(i) / f64::from(self.aircraft + 1);
                    object(i, PixelGeometry::Point([x, 0.4 * h]))
                })
                .collect();
        }
        if features.houses {
            result.houses = (1..=self.houses)
                .map(|i| {
                    let mut d = object(i, PixelGeometry::Point([0.1 * w + 20.0 * f64::from(i), 0.8 * h]));
                    d.area_px = Some(144.0);
                    d
                })
                .collect();
        }
        if features.roads {
            result.roads = (1..=self.roads)
                .map(|i| {
                    let y = h * f64::from(i) / f64::from(self.roads + 1);
                    let mut d = object(i, PixelGeometry::Polyline(vec![[0.0, y], [w, y]]));
                    d.width_px = Some(4.0);
                    d
                })
                .collect();
        }
        if features.water_bodies {
            result.water_bodies = (1..=self.water_bodies)
                .map(|i| {
                    let x0 = 0.6 * w + 30.0 * f64::from(i);
                    let y0 = 0.7 * h;
                    let ring = vec![
                        [x0, y0],
                        [x0 + 20.0, y0],
                        [x0 + 20.0, y0 + 20.0],
                        [x0, y0 + 20.0],
                        [x0, y0],
                    ];
                    let mut d = object(i, PixelGeometry::Polygon(ring));
                    d.area_px = Some(400.0);
                    d
                })
                .collect();
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_demo_counts() {
        let result = FixedDetector::default()
            .detect(&[], &FeatureSet::all())
            .unwrap();
        assert!(result.runway_detected());
        assert_eq!(result.aircraft.len(), 3);
        assert_eq!(result.houses.len(), 2);
        assert_eq!(result.roads.len(), 3);
        assert_eq!(result.water_bodies.len(), 1);
    }

    #[test]
    fn honours_disabled_features() {
        let features = FeatureSet {
            aircraft: false,
            runways: false,
            ..FeatureSet::all()
        };
        let result = FixedDetector::default().detect(&[], &features).unwrap();
        assert!(!result.runway_detected());
        assert!(result.aircraft.is_empty());
        assert_eq!(result.houses.len(), 2);
    }
}
