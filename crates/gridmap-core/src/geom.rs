#![forbid(unsafe_code)]

//! Coordinate and path helpers.
//!
//! Paths are computed in a flat `(lng, lat)` plane; nothing here accounts for projection or
//! great-circle distance.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub type Unit = euclid::UnknownUnit;

/// Flat `(x = lng, y = lat)` point used for interpolation.
pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub fn to_point(self) -> Point {
        point(self.lng, self.lat)
    }

    pub fn from_point(p: Point) -> Self {
        Self::new(p.y, p.x)
    }
}

/// Two-point line from `start` to `end`.
pub fn straight_path(start: LatLng, end: LatLng) -> Vec<LatLng> {
    vec![start, end]
}

/// Decorative zigzag between two coordinates.
///
/// Produces `segments + 1` points: `start`, `segments - 1` interior points spaced evenly along
/// the line, and `end`. Interior point `i` is pushed sideways along the longitude axis by
/// `±variation * (Δlng / segments)`, positive on even `i` and negative on odd `i`.
/// `segments == 0` is treated as `1` (a straight line).
pub fn zigzag_path(start: LatLng, end: LatLng, segments: usize, variation: f64) -> Vec<LatLng> {
    let n = segments.max(1);
    let a = start.to_point();
    let b = end.to_point();
    let delta: Vector = b - a;
    let step_lng = delta.x / n as f64;

    let mut points = Vec::with_capacity(n + 1);
    points.push(start);
    for i in 1..n {
        let t = i as f64 / n as f64;
        let on_line = a.lerp(b, t);
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let offset = euclid::vec2::<f64, Unit>(sign * variation * step_lng, 0.0);
        points.push(LatLng::from_point(on_line + offset));
    }
    points.push(end);
    points
}

/// Anchor used for popups on a path: the element at `len / 2`.
pub fn path_midpoint(path: &[LatLng]) -> Option<LatLng> {
    path.get(path.len() / 2).copied()
}

/// Visible map region, used for random placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    /// Uniform point inside the bounds. Degenerate spans yield the corner coordinate.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> LatLng {
        let lat_span = self.north_east.lat - self.south_west.lat;
        let lng_span = self.north_east.lng - self.south_west.lng;
        let lat = self.south_west.lat + lat_span * rng.gen_range(0.0..=1.0);
        let lng = self.south_west.lng + lng_span * rng.gen_range(0.0..=1.0);
        LatLng::new(lat, lng)
    }
}
