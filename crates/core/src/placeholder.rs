//! Demo detection data used to backfill analyses that have never been
//! processed.
//!
//! Everything here is a pure function of the coordinates, so repeated calls
//! produce byte-identical documents.

use serde_json::{json, Value};

use crate::detection::DetectionOutput;
use crate::geo::distance_m;

pub const DEMO_AIRCRAFT: i32 = 3;
pub const DEMO_HOUSES: i32 = 2;
pub const DEMO_ROADS: i32 = 3;
pub const DEMO_WATER_BODIES: i32 = 1;

/// Runway half-extent in degrees (`lon`, `lat`).
const RUNWAY_HALF: (f64, f64) = (0.01, 0.005);

fn pt(lon: f64, lat: f64) -> Value {
    json!([lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)])
}

fn feature(properties: Value, geometry: Value) -> Value {
    json!({ "type": "Feature", "properties": properties, "geometry": geometry })
}

/// Placeholder `FeatureCollection` centred on `(lat, lon)`.
pub fn demo_geojson(lat: f64, lon: f64) -> Value {
    let (hx, hy) = RUNWAY_HALF;
    let mut features = vec![feature(
        json!({ "type": "runway", "id": 1, "area": 15000 }),
        json!({
            "type": "Polygon",
            "coordinates": [[
                pt(lon - hx, lat - hy),
                pt(lon + hx, lat - hy),
                pt(lon + hx, lat + hy),
                pt(lon - hx, lat + hy),
                pt(lon - hx, lat - hy),
            ]],
        }),
    )];

    let aircraft = [(-0.005, 0.002), (0.005, -0.001), (0.0, 0.0)];
    for (i, (dx, dy)) in aircraft.iter().enumerate() {
        features.push(feature(
            json!({ "type": "aircraft", "id": i + 1 }),
            json!({ "type": "Point", "coordinates": pt(lon + dx, lat + dy) }),
        ));
    }

    let houses = [(-0.008, -0.003), (-0.007, -0.004)];
    for (i, (dx, dy)) in houses.iter().enumerate() {
        features.push(feature(
            json!({ "type": "house", "id": i + 1 }),
            json!({ "type": "Point", "coordinates": pt(lon + dx, lat + dy) }),
        ));
    }

    let roads = [
        (1, 1200, [(-0.01, -0.01), (0.01, 0.01)]),
        (2, 800, [(-0.01, 0.01), (0.01, -0.01)]),
        (3, 500, [(0.0, -0.01), (0.0, 0.01)]),
    ];
    for (id, length, [(ax, ay), (bx, by)]) in roads {
        features.push(feature(
            json!({ "type": "road", "id": id, "length": length }),
            json!({
                "type": "LineString",
                "coordinates": [pt(lon + ax, lat + ay), pt(lon + bx, lat + by)],
            }),
        ));
    }

    features.push(feature(
        json!({ "type": "water_body", "id": 1, "area": 5000 }),
        json!({
            "type": "Polygon",
            "coordinates": [[
                pt(lon - 0.007, lat + 0.004),
                pt(lon - 0.004, lat + 0.004),
                pt(lon - 0.004, lat + 0.007),
                pt(lon - 0.007, lat + 0.007),
                pt(lon - 0.007, lat + 0.004),
            ]],
        }),
    ));

    json!({ "type": "FeatureCollection", "features": features })
}

/// Full placeholder detection result for `(lat, lon)`.
pub fn demo_output(lat: f64, lon: f64) -> DetectionOutput {
    let (hx, hy) = RUNWAY_HALF;
    let across = distance_m([lon - hx, lat], [lon + hx, lat]);
    let along = distance_m([lon, lat - hy], [lon, lat + hy]);

    DetectionOutput {
        runway_detected: true,
        runway_length: Some(across.max(along).round()),
        runway_width: Some(across.min(along).round()),
        aircraft_count: DEMO_AIRCRAFT,
        house_count: DEMO_HOUSES,
        road_count: DEMO_ROADS,
        water_body_count: DEMO_WATER_BODIES,
        geojson: demo_geojson(lat, lon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geojson_is_stable() {
        let a = serde_json::to_string(&demo_geojson(12.97, 77.59)).unwrap();
        let b = serde_json::to_string(&demo_geojson(12.97, 77.59)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn geojson_feature_counts_match_output() {
        let output = demo_output(12.97, 77.59);
        let features = output.geojson["features"].as_array().unwrap();
        let of_type = |t: &str| {
            features
                .iter()
                .filter(|f| f["properties"]["type"] == t)
                .count() as i32
        };
        assert_eq!(of_type("runway"), 1);
        assert_eq!(of_type("aircraft"), output.aircraft_count);
        assert_eq!(of_type("house"), output.house_count);
        assert_eq!(of_type("road"), output.road_count);
        assert_eq!(of_type("water_body"), output.water_body_count);
    }

    #[test]
    fn runway_is_longer_than_wide_near_equator() {
        let output = demo_output(0.0, 0.0);
        let length = output.runway_length.unwrap();
        let width = output.runway_width.unwrap();
        assert!((length - 2224.0).abs() < 5.0, "got {length}");
        assert!((width - 1112.0).abs() < 5.0, "got {width}");
    }

    #[test]
    fn coordinates_stay_in_range_at_the_antimeridian() {
        let doc = demo_geojson(90.0, 180.0);
        let text = serde_json::to_string(&doc).unwrap();
        assert!(!text.contains("180.01"));
        assert!(!text.contains("90.005"));
    }
}
