//! Object detection capability.
//!
//! A [`Detector`] looks at raw image bytes and reports what it found in
//! pixel space ([`DetectionResult`]). The result is projected onto the
//! ground through a [`GeoFrame`] to produce the [`DetectionOutput`] that is
//! persisted on an analysis image (counts, runway size, GeoJSON).
//!
//! Two implementations ship:
//! - [`SeededDetector`] -- production heuristic, deterministic per image content.
//! - [`FixedDetector`] -- fixed layout for tests and demos.

mod fixed;
mod seeded;

pub use fixed::FixedDetector;
pub use seeded::SeededDetector;

use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::features::FeatureSet;
use crate::geo::distance_m;

/// Ground distance covered by one image edge, in degrees of latitude.
pub const DEFAULT_SPAN_DEG: f64 = 0.02;

/// Metres per degree of latitude.
const METRES_PER_DEG: f64 = 111_320.0;

/// Finds objects in a satellite image.
///
/// Disabled features must come back empty. Implementations must be safe to
/// share across request tasks.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &[u8], features: &FeatureSet) -> Result<DetectionResult, DetectionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

impl From<DetectionError> for CoreError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::Decode(_) => {
                CoreError::Validation("File is not a readable image".into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pixel-space results
// ---------------------------------------------------------------------------

/// Geometry in image pixel coordinates (`x` right, `y` down).
#[derive(Debug, Clone, PartialEq)]
pub enum PixelGeometry {
    /// Axis-aligned bounding box `[x0, y0, x1, y1]`.
    Box([f64; 4]),
    Point([f64; 2]),
    Polyline(Vec<[f64; 2]>),
    /// Closed ring (first point repeated at the end).
    Polygon(Vec<[f64; 2]>),
}

/// A single detected object.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub id: u32,
    pub confidence: f64,
    pub geometry: PixelGeometry,
    /// Object width in pixels, when meaningful (roads).
    pub width_px: Option<f64>,
    /// Object area in square pixels, when meaningful (houses, water bodies).
    pub area_px: Option<f64>,
}

/// Everything a detector found in one image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    pub width: u32,
    pub height: u32,
    pub runways: Vec<Detection>,
    pub aircraft: Vec<Detection>,
    pub houses: Vec<Detection>,
    pub roads: Vec<Detection>,
    pub water_bodies: Vec<Detection>,
}

impl DetectionResult {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn runway_detected(&self) -> bool {
        !self.runways.is_empty()
    }

    /// Project onto the ground and summarise for persistence.
    pub fn to_output(&self, frame: &GeoFrame) -> DetectionOutput {
        let (runway_length, runway_width) = self
            .runways
            .iter()
            .filter_map(|r| match &r.geometry {
                PixelGeometry::Box(b) => Some(frame.box_dimensions_m(*b, self.width, self.height)),
                _ => None,
            })
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map_or((None, None), |(l, w)| (Some(l), Some(w)));

        let mut features = Vec::new();
        for (kind, list) in [
            ("runway", &self.runways),
            ("aircraft", &self.aircraft),
            ("house", &self.houses),
            ("road", &self.roads),
            ("water_body", &self.water_bodies),
        ] {
            for detection in list {
                features.push(frame.feature(kind, detection, self.width, self.height));
            }
        }

        DetectionOutput {
            runway_detected: self.runway_detected(),
            runway_length,
            runway_width,
            aircraft_count: count(&self.aircraft),
            house_count: count(&self.houses),
            road_count: count(&self.roads),
            water_body_count: count(&self.water_bodies),
            geojson: json!({
                "type": "FeatureCollection",
                "features": features,
            }),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn count(list: &[Detection]) -> i32 {
    i32::try_from(list.len()).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Ground projection
// ---------------------------------------------------------------------------

/// Maps image pixels onto longitude/latitude around an analysis point.
///
/// The image is assumed north-up and centred on the point, covering
/// `span_deg` degrees of latitude vertically and the same ground distance
/// horizontally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFrame {
    pub center_lat: f64,
    pub center_lon: f64,
    pub span_deg: f64,
}

impl GeoFrame {
    pub fn new(center_lat: f64, center_lon: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            span_deg: DEFAULT_SPAN_DEG,
        }
    }

    fn lon_span(&self) -> f64 {
        self.span_deg / self.center_lat.to_radians().cos().max(0.01)
    }

    /// Convert a pixel position to `[lon, lat]`.
    pub fn project(&self, px: [f64; 2], width: u32, height: u32) -> [f64; 2] {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        let lon = self.center_lon - self.lon_span() / 2.0 + px[0] / w * self.lon_span();
        let lat = self.center_lat + self.span_deg / 2.0 - px[1] / h * self.span_deg;
        [lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)]
    }

    /// Ground size of one pixel, in metres.
    pub fn metres_per_pixel(&self, height: u32) -> f64 {
        self.span_deg * METRES_PER_DEG / f64::from(height.max(1))
    }

    /// `(length, width)` in metres of a pixel bounding box; length is the longer side.
    fn box_dimensions_m(&self, b: [f64; 4], width: u32, height: u32) -> (f64, f64) {
        let nw = self.project([b[0], b[1]], width, height);
        let ne = self.project([b[2], b[1]], width, height);
        let sw = self.project([b[0], b[3]], width, height);
        let horizontal = distance_m(nw, ne);
        let vertical = distance_m(nw, sw);
        (horizontal.max(vertical), horizontal.min(vertical))
    }

    fn feature(&self, kind: &str, detection: &Detection, width: u32, height: u32) -> Value {
        let project = |p: &[f64; 2]| {
            let [lon, lat] = self.project(*p, width, height);
            json!([lon, lat])
        };
        let geometry = match &detection.geometry {
            PixelGeometry::Box(b) => {
                let ring: Vec<Value> = [
                    [b[0], b[1]],
                    [b[2], b[1]],
                    [b[2], b[3]],
                    [b[0], b[3]],
                    [b[0], b[1]],
                ]
                .iter()
                .map(project)
                .collect();
                json!({ "type": "Polygon", "coordinates": [ring] })
            }
            PixelGeometry::Point(p) => json!({ "type": "Point", "coordinates": project(p) }),
            PixelGeometry::Polyline(points) => json!({
                "type": "LineString",
                "coordinates": points.iter().map(project).collect::<Vec<_>>(),
            }),
            PixelGeometry::Polygon(ring) => json!({
                "type": "Polygon",
                "coordinates": [ring.iter().map(project).collect::<Vec<_>>()],
            }),
        };

        let mpp = self.metres_per_pixel(height);
        let mut properties = Map::new();
        properties.insert("type".into(), json!(kind));
        properties.insert("id".into(), json!(detection.id));
        properties.insert("confidence".into(), json!(detection.confidence));
        if let Some(area) = detection.area_px {
            properties.insert("area".into(), json!((area * mpp * mpp).round()));
        }
        if let Some(w) = detection.width_px {
            properties.insert("width".into(), json!(round1(w * mpp)));
        }
        if let PixelGeometry::Box(b) = &detection.geometry {
            let (length, w) = self.box_dimensions_m(*b, width, height);
            properties.insert("length".into(), json!(round1(length)));
            properties.insert("width".into(), json!(round1(w)));
        }

        json!({
            "type": "Feature",
            "properties": properties,
            "geometry": geometry,
        })
    }
}

// ---------------------------------------------------------------------------
// Persisted summary
// ---------------------------------------------------------------------------

/// Detection results in the shape stored on an analysis image.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutput {
    pub runway_detected: bool,
    pub runway_length: Option<f64>,
    pub runway_width: Option<f64>,
    pub aircraft_count: i32,
    pub house_count: i32,
    pub road_count: i32,
    pub water_body_count: i32,
    /// GeoJSON `FeatureCollection`.
    pub geojson: Value,
}
