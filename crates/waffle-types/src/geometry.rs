//! 2D vector/angle math, bounding boxes, and curve sampling (component A).

use serde::{Deserialize, Serialize};

/// A point or free vector in the sketch plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// The z-component of the 3D cross product of two 2D vectors.
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    pub fn distance_squared(self, other: Vec2) -> f64 {
        (self - other).length_squared()
    }

    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len < 1e-12 {
            Vec2::ZERO
        } else {
            self / len
        }
    }

    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// An axis-aligned bounding box in sketch space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.expand(p);
        }
        Some(bbox)
    }

    pub fn expand(&mut self, p: Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn expanded_by(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min: Vec2::new(self.min.x - margin, self.min.y - margin),
            max: Vec2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn area(&self) -> f64 {
        (self.max.x - self.min.x).max(0.0) * (self.max.y - self.min.y).max(0.0)
    }
}

/// A plane embedded in 3D: an origin and an orthonormal (x, y, normal) frame.
/// Sketches live in the (x, y) subspace of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: [f64; 3],
    pub x_axis: [f64; 3],
    pub y_axis: [f64; 3],
    pub normal: [f64; 3],
}

impl Plane {
    pub fn xy() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            x_axis: [1.0, 0.0, 0.0],
            y_axis: [0.0, 1.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        }
    }

    pub fn to_world(&self, p: Vec2) -> [f64; 3] {
        [
            self.origin[0] + self.x_axis[0] * p.x + self.y_axis[0] * p.y,
            self.origin[1] + self.x_axis[1] * p.x + self.y_axis[1] * p.y,
            self.origin[2] + self.x_axis[2] * p.x + self.y_axis[2] * p.y,
        ]
    }

    pub fn to_sketch(&self, p: [f64; 3]) -> Vec2 {
        let d = [
            p[0] - self.origin[0],
            p[1] - self.origin[1],
            p[2] - self.origin[2],
        ];
        Vec2::new(
            d[0] * self.x_axis[0] + d[1] * self.x_axis[1] + d[2] * self.x_axis[2],
            d[0] * self.y_axis[0] + d[1] * self.y_axis[1] + d[2] * self.y_axis[2],
        )
    }

    /// Translate the plane's origin by a delta expressed in sketch-space
    /// coordinates. Any plane change dirties the solver.
    pub fn translate_in_sketch(&mut self, delta: Vec2) {
        let world_delta = [
            self.x_axis[0] * delta.x + self.y_axis[0] * delta.y,
            self.x_axis[1] * delta.x + self.y_axis[1] * delta.y,
            self.x_axis[2] * delta.x + self.y_axis[2] * delta.y,
        ];
        self.origin[0] += world_delta[0];
        self.origin[1] += world_delta[1];
        self.origin[2] += world_delta[2];
    }
}

/// Sample an arc into `segments + 1` polyline points, inclusive of both ends,
/// sweeping CCW from `start_angle` to `end_angle`.
pub fn sample_arc(center: Vec2, radius: f64, start_angle: f64, end_angle: f64, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(1);
    let sweep = normalize_sweep(start_angle, end_angle);
    (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            let angle = start_angle + sweep * t;
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Sample a full circle into `segments` polyline points (not closed).
pub fn sample_circle(center: Vec2, radius: f64, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let angle = std::f64::consts::TAU * (i as f64) / (segments as f64);
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// Sample an ellipse (major radius along the local x-axis, rotated by
/// `rotation` radians) into `segments` polyline points (not closed).
pub fn sample_ellipse(
    center: Vec2,
    major_radius: f64,
    minor_radius: f64,
    rotation: f64,
    segments: usize,
) -> Vec<Vec2> {
    let segments = segments.max(3);
    let (s, c) = rotation.sin_cos();
    (0..segments)
        .map(|i| {
            let t = std::f64::consts::TAU * (i as f64) / (segments as f64);
            let lx = major_radius * t.cos();
            let ly = minor_radius * t.sin();
            center + Vec2::new(lx * c - ly * s, lx * s + ly * c)
        })
        .collect()
}

/// The positive CCW sweep (in radians, in `[0, 2*pi)`) from `start` to `end`.
pub fn normalize_sweep(start: f64, end: f64) -> f64 {
    let mut sweep = end - start;
    while sweep < 0.0 {
        sweep += std::f64::consts::TAU;
    }
    while sweep >= std::f64::consts::TAU {
        sweep -= std::f64::consts::TAU;
    }
    sweep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_round_trip() {
        let plane = Plane::xy();
        let p = Vec2::new(3.0, -2.0);
        let world = plane.to_world(p);
        let back = plane.to_sketch(world);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn bbox_intersects() {
        let a = BoundingBox {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(1.0, 1.0),
        };
        let b = BoundingBox {
            min: Vec2::new(0.5, 0.5),
            max: Vec2::new(2.0, 2.0),
        };
        assert!(a.intersects(&b));
    }

    #[test]
    fn sample_arc_endpoints() {
        let pts = sample_arc(Vec2::ZERO, 1.0, 0.0, std::f64::consts::FRAC_PI_2, 4);
        assert_relative_eq!(pts.first().unwrap().x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(pts.last().unwrap().y, 1.0, epsilon = 1e-9);
    }
}
