//! Satellite imagery capability.
//!
//! [`ImageSource`] hands back the most recent image for a coordinate. The
//! only implementation, [`SyntheticImagery`], paints a plausible-looking
//! scene instead of calling an imagery provider.

use std::io::Cursor;

use chrono::Utc;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::types::Timestamp;

/// An image obtained for an analysis.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Acquisition date of the scene.
    pub image_date: Timestamp,
    /// File extension matching `bytes` (no dot).
    pub extension: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageryError {
    #[error("could not encode image: {0}")]
    Encode(#[from] image::ImageError),
}

impl From<ImageryError> for CoreError {
    fn from(err: ImageryError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

pub trait ImageSource: Send + Sync {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<FetchedImage, ImageryError>;
}

const WATER: Rgb<u8> = Rgb([0x1a, 0x52, 0x76]);
const LAND: Rgb<u8> = Rgb([0x2e, 0xcc, 0x71]);
const ROAD: Rgb<u8> = Rgb([0x95, 0xa5, 0xa6]);
const BUILDING: Rgb<u8> = Rgb([0xec, 0xf0, 0xf1]);
const RUNWAY: Rgb<u8> = Rgb([0x7f, 0x8c, 0x8d]);
const AIRCRAFT: Rgb<u8> = Rgb([0xe7, 0x4c, 0x3c]);

/// Renders a deterministic PNG scene per coordinate pair.
///
/// Northern-hemisphere scenes get an airfield (runway plus parked aircraft).
#[derive(Debug, Clone)]
pub struct SyntheticImagery {
    pub size: u32,
}

impl Default for SyntheticImagery {
    fn default() -> Self {
        Self { size: 512 }
    }
}

impl ImageSource for SyntheticImagery {
    fn fetch(&self, latitude: f64, longitude: f64) -> Result<FetchedImage, ImageryError> {
        let img = self.render(latitude, longitude);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png)?;
        Ok(FetchedImage {
            bytes: out.into_inner(),
            image_date: Utc::now(),
            extension: "png",
        })
    }
}

impl SyntheticImagery {
    pub fn render(&self, latitude: f64, longitude: f64) -> RgbImage {
        let size = self.size.max(16);
        let s = i64::from(size);
        let seed: [u8; 32] = Sha256::digest(format!("{latitude:.6},{longitude:.6}")).into();
        let mut rng = StdRng::from_seed(seed);
        let mut img = RgbImage::from_pixel(size, size, WATER);

        for _ in 0..rng.random_range(3..=6) {
            let cx = rng.random_range(0..s);
            let cy = rng.random_range(0..s);
            let rx = rng.random_range(s / 8..=s / 3);
            let ry = rng.random_range(s / 8..=s / 3);
            fill_ellipse(&mut img, cx, cy, rx, ry, LAND);
        }

        for _ in 0..rng.random_range(3..=6) {
            let from = (rng.random_range(0..s), rng.random_range(0..s));
            let to = (rng.random_range(0..s), rng.random_range(0..s));
            draw_line(&mut img, from, to, 2, ROAD);
        }

        for _ in 0..rng.random_range(20..=40) {
            let x = rng.random_range(0..s);
            let y = rng.random_range(0..s);
            let w = rng.random_range(4..=10);
            let h = rng.random_range(4..=10);
            fill_rect(&mut img, x, y, x + w, y + h, BUILDING);
        }

        if latitude > 0.0 {
            let y = s / 2;
            fill_rect(&mut img, s / 10, y - s / 40, s - s / 10, y + s / 40, RUNWAY);
            for i in 0..rng.random_range(1..=4) {
                let x = s / 5 + i * s / 6;
                fill_rect(&mut img, x, y - s / 10, x + s / 40, y - s / 16, AIRCRAFT);
            }
        }

        img
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            put(img, x, y, color);
        }
    }
}

fn fill_ellipse(img: &mut RgbImage, cx: i64, cy: i64, rx: i64, ry: i64, color: Rgb<u8>) {
    let (rx2, ry2) = ((rx * rx).max(1) as f64, (ry * ry).max(1) as f64);
    for y in cy - ry..=cy + ry {
        for x in cx - rx..=cx + rx {
            let dx = (x - cx) as f64;
            let dy = (y - cy) as f64;
            if dx * dx / rx2 + dy * dy / ry2 <= 1.0 {
                put(img, x, y, color);
            }
        }
    }
}

fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), half_width: i64, color: Rgb<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).max(1);
    for i in 0..=steps {
        let x = from.0 + (to.0 - from.0) * i / steps;
        let y = from.1 + (to.1 - from.1) * i / steps;
        fill_rect(img, x - half_width, y - half_width, x + half_width, y + half_width, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_coordinates_same_scene() {
        let imagery = SyntheticImagery { size: 64 };
        assert_eq!(imagery.render(12.97, 77.59), imagery.render(12.97, 77.59));
        assert_ne!(imagery.render(12.97, 77.59), imagery.render(-12.97, 77.59));
    }

    #[test]
    fn northern_scene_has_runway_pixels() {
        let img = SyntheticImagery { size: 128 }.render(10.0, 10.0);
        assert!(img.pixels().any(|p| *p == RUNWAY));
        let south = SyntheticImagery { size: 128 }.render(-10.0, 10.0);
        assert!(!south.pixels().any(|p| *p == RUNWAY));
    }

    #[test]
    fn fetch_returns_decodable_png() {
        let fetched = SyntheticImagery { size: 64 }.fetch(1.0, 2.0).unwrap();
        assert_eq!(fetched.extension, "png");
        let decoded = image::load_from_memory(&fetched.bytes).unwrap();
        assert_eq!(decoded.width(), 64);
    }
}
