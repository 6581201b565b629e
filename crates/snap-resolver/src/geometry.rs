//! Geometric primitives for snap candidate generation: nearest-point and
//! intersection routines, grounded on `SnapManager`'s static helpers.

use waffle_types::Vec2;

pub(crate) fn nearest_point_on_line(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-20 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a.lerp(b, t)
}

pub(crate) fn nearest_point_on_circle(p: Vec2, center: Vec2, radius: f64) -> Vec2 {
    let dir = (p - center).normalized();
    if dir == Vec2::ZERO {
        center + Vec2::new(radius, 0.0)
    } else {
        center + dir * radius
    }
}

pub(crate) fn line_line_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;
    let denom = d1.cross(d2);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (p3 - p1).cross(d2) / denom;
    Some(p1 + d1 * t)
}

pub(crate) fn line_circle_intersection(a: Vec2, b: Vec2, center: Vec2, radius: f64) -> Vec<Vec2> {
    let d = b - a;
    let f = a - center;
    let a_coeff = d.length_squared();
    if a_coeff < 1e-20 {
        return Vec::new();
    }
    let b_coeff = 2.0 * f.dot(d);
    let c_coeff = f.length_squared() - radius * radius;
    let discriminant = b_coeff * b_coeff - 4.0 * a_coeff * c_coeff;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b_coeff - sqrt_disc) / (2.0 * a_coeff);
    let t2 = (-b_coeff + sqrt_disc) / (2.0 * a_coeff);
    let mut out = Vec::new();
    for t in [t1, t2] {
        if (0.0..=1.0).contains(&t) {
            out.push(a + d * t);
        }
    }
    out
}

pub(crate) fn circle_circle_intersection(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> Vec<Vec2> {
    let d = c1.distance(c2);
    if d < 1e-12 || d > r1 + r2 || d < (r1 - r2).abs() {
        return Vec::new();
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - a * a;
    if h_sq < 0.0 {
        return Vec::new();
    }
    let h = h_sq.sqrt();
    let mid = c1 + (c2 - c1) * (a / d);
    let perp = (c2 - c1).perp().normalized();
    if h < 1e-12 {
        vec![mid]
    } else {
        vec![mid + perp * h, mid - perp * h]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_line_intersects_at_origin() {
        let p = line_line_intersection(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, 1.0),
        )
        .unwrap();
        assert!((p.x).abs() < 1e-9 && (p.y).abs() < 1e-9);
    }

    #[test]
    fn circle_circle_two_points() {
        let pts = circle_circle_intersection(Vec2::new(-1.0, 0.0), 2.0, Vec2::new(1.0, 0.0), 2.0);
        assert_eq!(pts.len(), 2);
    }
}
