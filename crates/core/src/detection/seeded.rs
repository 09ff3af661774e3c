use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use super::{Detection, DetectionError, DetectionResult, Detector, PixelGeometry};
use crate::features::FeatureSet;

/// Longest edge the runway scan works on; larger images are downscaled first.
const WORK_SIZE: u32 = 256;

/// Heuristic detector.
///
/// Runways come from a brightness threshold followed by connected-component
/// analysis: a component qualifies when it is strongly elongated and covers
/// a minimum share of the image. The other classes are simulated from a
/// random generator seeded by the image content, so the same bytes always
/// yield the same result.
#[derive(Debug, Clone)]
pub struct SeededDetector {
    /// Luma values strictly above this are considered pavement.
    pub threshold: u8,
    /// Minimum bounding-box area of a runway as a fraction of the image.
    pub min_runway_fraction: f64,
    /// Aspect ratio (long side / short side) a runway must exceed.
    pub min_aspect: f64,
}

impl Default for SeededDetector {
    fn default() -> Self {
        Self {
            threshold: 100,
            min_runway_fraction: 0.01,
            min_aspect: 5.0,
        }
    }
}

impl Detector for SeededDetector {
    fn detect(&self, image: &[u8], features: &FeatureSet) -> Result<DetectionResult, DetectionError> {
        let decoded = image::load_from_memory(image)?;
        let (width, height) = decoded.dimensions();
        let digest: [u8; 32] = Sha256::digest(image).into();

        let mut result = DetectionResult::empty(width, height);
        let (w, h) = (f64::from(width), f64::from(height));

        if features.runways {
            result.runways = self.scan_runways(&decoded);
        }
        if features.aircraft {
            result.aircraft = simulate_aircraft(&mut feature_rng(&digest, "aircraft"), w, h);
        }
        if features.houses {
            result.houses = simulate_houses(&mut feature_rng(&digest, "houses"), w, h);
        }
        if features.roads {
            result.roads = simulate_roads(&mut feature_rng(&digest, "roads"), w, h);
        }
        if features.water_bodies {
            result.water_bodies = simulate_water(&mut feature_rng(&digest, "water"), w, h);
        }

        Ok(result)
    }
}

impl SeededDetector {
    fn scan_runways(&self, image: &DynamicImage) -> Vec<Detection> {
        let (width, height) = image.dimensions();
        let luma: GrayImage = if width.max(height) > WORK_SIZE {
            image.resize(WORK_SIZE, WORK_SIZE, FilterType::Nearest).to_luma8()
        } else {
            image.to_luma8()
        };
        let (sw, sh) = luma.dimensions();
        if sw == 0 || sh == 0 {
            return Vec::new();
        }
        let scale_x = f64::from(width) / f64::from(sw);
        let scale_y = f64::from(height) / f64::from(sh);
        let min_area = f64::from(sw) * f64::from(sh) * self.min_runway_fraction;

        let mut runways = Vec::new();
        for [x0, y0, x1, y1] in bright_components(&luma, self.threshold) {
            let bw = f64::from(x1 - x0 + 1);
            let bh = f64::from(y1 - y0 + 1);
            let aspect = bw / bh;
            if !(aspect > self.min_aspect || aspect < 1.0 / self.min_aspect) || bw * bh <= min_area {
                continue;
            }
            runways.push(Detection {
                id: runways.len() as u32 + 1,
                confidence: 0.9,
                geometry: PixelGeometry::Box([
                    f64::from(x0) * scale_x,
                    f64::from(y0) * scale_y,
                    f64::from(x1 + 1) * scale_x,
                    f64::from(y1 + 1) * scale_y,
                ]),
                width_px: None,
                area_px: Some(bw * bh * scale_x * scale_y),
            });
        }
        runways
    }
}

/// Bounding boxes `[x0, y0, x1, y1]` (inclusive) of 4-connected regions
/// brighter than `threshold`.
fn bright_components(luma: &GrayImage, threshold: u8) -> Vec<[u32; 4]> {
    let (w, h) = luma.dimensions();
    let idx = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;
    let mut seen = vec![false; (w as usize) * (h as usize)];
    let mut boxes = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            if seen[idx(x, y)] || luma.get_pixel(x, y)[0] <= threshold {
                continue;
            }
            seen[idx(x, y)] = true;
            queue.push_back((x, y));
            let mut bbox = [x, y, x, y];

            while let Some((cx, cy)) = queue.pop_front() {
                bbox[0] = bbox[0].min(cx);
                bbox[1] = bbox[1].min(cy);
                bbox[2] = bbox[2].max(cx);
                bbox[3] = bbox[3].max(cy);

                let neighbours = [
                    (cx.wrapping_sub(1), cy),
                    (cx + 1, cy),
                    (cx, cy.wrapping_sub(1)),
                    (cx, cy + 1),
                ];
                for (nx, ny) in neighbours {
                    if nx >= w || ny >= h || seen[idx(nx, ny)] {
                        continue;
                    }
                    if luma.get_pixel(nx, ny)[0] > threshold {
                        seen[idx(nx, ny)] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
            boxes.push(bbox);
        }
    }
    boxes
}

fn feature_rng(digest: &[u8; 32], label: &str) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(digest);
    hasher.update(label.as_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

/// Uniform sample in `[lo, hi]`, collapsing to `lo` on an empty range.
fn span(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

fn simulate_aircraft(rng: &mut StdRng, w: f64, h: f64) -> Vec<Detection> {
    let n = rng.random_range(0..=5u32);
    (1..=n)
        .map(|id| {
            let x = span(rng, w / 4.0, 3.0 * w / 4.0);
            let y = span(rng, h / 4.0, 3.0 * h / 4.0);
            Detection {
                id,
                confidence: rng.random_range(0.6..0.95),
                geometry: PixelGeometry::Point([x, y]),
                width_px: None,
                area_px: None,
            }
        })
        .collect()
}

fn simulate_houses(rng: &mut StdRng, w: f64, h: f64) -> Vec<Detection> {
    let n = rng.random_range(10..=50u32);
    (1..=n)
        .map(|id| {
            let size_w = rng.random_range(8.0..=20.0);
            let size_h = rng.random_range(8.0..=20.0);
            let x = span(rng, 0.0, w - size_w);
            let y = span(rng, 0.0, h - size_h);
            Detection {
                id,
                confidence: rng.random_range(0.6..0.95),
                geometry: PixelGeometry::Point([x + size_w / 2.0, y + size_h / 2.0]),
                width_px: None,
                area_px: Some(size_w * size_h),
            }
        })
        .collect()
}

fn simulate_roads(rng: &mut StdRng, w: f64, h: f64) -> Vec<Detection> {
    let n = rng.random_range(3..=8u32);
    (1..=n)
        .map(|id| {
            let segments = rng.random_range(2..=5u32);
            let mut points = Vec::with_capacity(segments as usize);
            let mut x = span(rng, 0.0, w);
            let mut y = span(rng, 0.0, h);
            points.push([x, y]);
            for _ in 1..segments {
                let angle = rng.random_range(0.0..TAU);
                let dist = rng.random_range(50.0..=200.0);
                x = (x + dist * angle.cos()).clamp(0.0, w);
                y = (y + dist * angle.sin()).clamp(0.0, h);
                points.push([x, y]);
            }
            Detection {
                id,
                confidence: rng.random_range(0.7..0.95),
                geometry: PixelGeometry::Polyline(points),
                width_px: Some(rng.random_range(2.0..=8.0)),
                area_px: None,
            }
        })
        .collect()
}

fn simulate_water(rng: &mut StdRng, w: f64, h: f64) -> Vec<Detection> {
    let n = rng.random_range(0..=3u32);
    (1..=n)
        .map(|id| {
            let cx = span(rng, 0.0, w);
            let cy = span(rng, 0.0, h);
            let radius = rng.random_range(30.0..=100.0);
            let vertices = rng.random_range(5..=10u32);
            let mut ring: Vec<[f64; 2]> = (0..vertices)
                .map(|i| {
                    let angle = TAU * f64::from(i) / f64::from(vertices);
                    let r = radius * rng.random_range(0.7..=1.3);
                    [
                        (cx + r * angle.cos()).clamp(0.0, w),
                        (cy + r * angle.sin()).clamp(0.0, h),
                    ]
                })
                .collect();
            ring.push(ring[0]);
            Detection {
                id,
                confidence: rng.random_range(0.6..0.9),
                geometry: PixelGeometry::Polygon(ring),
                width_px: None,
                area_px: Some(PI * radius * radius),
            }
        })
        .collect()
}
