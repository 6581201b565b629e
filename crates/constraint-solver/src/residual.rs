//! Residual and analytical-Jacobian construction per constraint kind, plus a
//! finite-difference fallback for kinds with no closed-form derivative.

use sketch_store::{Constraint, ConstraintKind, EntityId, Sketch};
use waffle_types::Vec2;

use crate::layout::{self, Layout};

const FINITE_DIFFERENCE_STEP: f64 = 1e-8;

/// An extra point-pin not backed by a stored constraint: used to hold the
/// dragged point at its target and other selected points at their current
/// position during a drag-solve.
pub(crate) type Pin = (EntityId, Vec2);

pub(crate) fn collect_residuals(sketch: &Sketch, layout: &Layout, params: &[f64], pins: &[Pin]) -> Vec<f64> {
    let mut out = Vec::new();
    for constraint in sketch.constraints() {
        constraint_residual(constraint, sketch, layout, params, &mut out);
    }
    for (point, target) in pins {
        if let Some((x, y)) = layout::point_xy(layout, params, *point) {
            out.push(x - target.x);
            out.push(y - target.y);
        }
    }
    out
}

fn constraint_residual(c: &Constraint, sketch: &Sketch, layout: &Layout, params: &[f64], out: &mut Vec<f64>) {
    match &c.kind {
        ConstraintKind::Coincident { point_a, point_b } => {
            if let (Some((ax, ay)), Some((bx, by))) = (
                layout::point_xy(layout, params, *point_a),
                layout::point_xy(layout, params, *point_b),
            ) {
                out.push(ax - bx);
                out.push(ay - by);
            }
        }
        ConstraintKind::Horizontal { line } => {
            if let Some((y0, y1)) = line_ys(sketch, layout, params, *line) {
                out.push(y0 - y1);
            }
        }
        ConstraintKind::Vertical { line } => {
            if let Some((x0, x1)) = line_xs(sketch, layout, params, *line) {
                out.push(x0 - x1);
            }
        }
        ConstraintKind::Parallel { line_a, line_b } => {
            if let (Some(a), Some(b)) = (line_dir(sketch, layout, params, *line_a), line_dir(sketch, layout, params, *line_b)) {
                out.push(a.cross(b));
            }
        }
        ConstraintKind::Perpendicular { line_a, line_b } => {
            if let (Some(a), Some(b)) = (line_dir(sketch, layout, params, *line_a), line_dir(sketch, layout, params, *line_b)) {
                out.push(a.dot(b));
            }
        }
        ConstraintKind::Tangent { entity_a, entity_b } => {
            out.push(tangent_residual(sketch, layout, params, *entity_a, *entity_b).unwrap_or(0.0));
        }
        ConstraintKind::Equal { entity_a, entity_b } => {
            if let (Some(a), Some(b)) = (scalar_measure(sketch, layout, params, *entity_a), scalar_measure(sketch, layout, params, *entity_b)) {
                out.push(a - b);
            }
        }
        ConstraintKind::Concentric { entity_a, entity_b } => {
            if let (Some(ca), Some(cb)) = (
                layout::center_point_id(sketch, *entity_a).and_then(|p| layout::point_xy(layout, params, p)),
                layout::center_point_id(sketch, *entity_b).and_then(|p| layout::point_xy(layout, params, p)),
            ) {
                out.push(ca.0 - cb.0);
                out.push(ca.1 - cb.1);
            }
        }
        ConstraintKind::PointOnCurve { point, curve, .. } => {
            out.push(point_on_curve_residual(sketch, layout, params, *point, *curve).unwrap_or(0.0));
        }
        ConstraintKind::Fixed { point, x, y } => {
            if let Some((px, py)) = layout::point_xy(layout, params, *point) {
                out.push(px - x);
                out.push(py - y);
            }
        }
        ConstraintKind::Distance { point_a, point_b, value } => {
            if let (Some((ax, ay)), Some((bx, by))) = (
                layout::point_xy(layout, params, *point_a),
                layout::point_xy(layout, params, *point_b),
            ) {
                let dist_sq = (ax - bx).powi(2) + (ay - by).powi(2);
                out.push(dist_sq - value * value);
            }
        }
        ConstraintKind::Radius { curve, value } => {
            if let Some(idx) = layout::radius_index(sketch, layout, *curve) {
                out.push(params[idx] - value);
            }
        }
        ConstraintKind::Diameter { curve, value } => {
            if let Some(idx) = layout::radius_index(sketch, layout, *curve) {
                out.push(params[idx] - value / 2.0);
            }
        }
        ConstraintKind::Angle { line_a, line_b, value } => {
            if let (Some(a), Some(b)) = (line_dir(sketch, layout, params, *line_a), line_dir(sketch, layout, params, *line_b)) {
                out.push(a.cross(b) - a.dot(b) * value.tan());
            }
        }
    }
}

/// Builds the Jacobian (row-major, `m x n`), using analytical derivatives
/// where cheap and a central-difference fallback otherwise.
pub(crate) fn build_jacobian(sketch: &Sketch, layout: &Layout, params: &[f64], pins: &[Pin], m: usize, n: usize) -> Vec<f64> {
    let mut jac = vec![0.0; m * n];
    let mut row = 0;
    for constraint in sketch.constraints() {
        row += constraint_jacobian(constraint, sketch, layout, params, n, &mut jac, row);
    }
    for (point, _) in pins {
        if let Some(idx) = layout.point_offset.get(point).copied() {
            jac[row * n + idx] = 1.0;
            jac[(row + 1) * n + idx + 1] = 1.0;
        }
        row += 2;
    }
    debug_assert_eq!(row, m);
    jac
}

fn constraint_jacobian(
    c: &Constraint,
    sketch: &Sketch,
    layout: &Layout,
    params: &[f64],
    n: usize,
    jac: &mut [f64],
    row: usize,
) -> usize {
    match &c.kind {
        ConstraintKind::Coincident { point_a, point_b } => {
            if let (Some(a), Some(b)) = (
                layout.point_offset.get(point_a).copied(),
                layout.point_offset.get(point_b).copied(),
            ) {
                jac[row * n + a] = 1.0;
                jac[row * n + b] = -1.0;
                jac[(row + 1) * n + a + 1] = 1.0;
                jac[(row + 1) * n + b + 1] = -1.0;
            }
            2
        }
        ConstraintKind::Horizontal { line } => {
            if let Some((s, e)) = layout::line_endpoints(sketch, *line) {
                if let (Some(si), Some(ei)) = (layout.point_offset.get(&s).copied(), layout.point_offset.get(&e).copied()) {
                    jac[row * n + si + 1] = 1.0;
                    jac[row * n + ei + 1] = -1.0;
                }
            }
            1
        }
        ConstraintKind::Vertical { line } => {
            if let Some((s, e)) = layout::line_endpoints(sketch, *line) {
                if let (Some(si), Some(ei)) = (layout.point_offset.get(&s).copied(), layout.point_offset.get(&e).copied()) {
                    jac[row * n + si] = 1.0;
                    jac[row * n + ei] = -1.0;
                }
            }
            1
        }
        ConstraintKind::Parallel { line_a, line_b } => {
            line_pair_skew_jacobian(sketch, layout, params, *line_a, *line_b, n, jac, row, false);
            1
        }
        ConstraintKind::Perpendicular { line_a, line_b } => {
            line_pair_skew_jacobian(sketch, layout, params, *line_a, *line_b, n, jac, row, true);
            1
        }
        ConstraintKind::Fixed { point, .. } => {
            if let Some(idx) = layout.point_offset.get(point).copied() {
                jac[row * n + idx] = 1.0;
                jac[(row + 1) * n + idx + 1] = 1.0;
            }
            2
        }
        ConstraintKind::Distance { point_a, point_b, .. } => {
            if let (Some((ax, ay)), Some((bx, by)), Some(ai), Some(bi)) = (
                layout::point_xy(layout, params, *point_a),
                layout::point_xy(layout, params, *point_b),
                layout.point_offset.get(point_a).copied(),
                layout.point_offset.get(point_b).copied(),
            ) {
                jac[row * n + ai] = 2.0 * (ax - bx);
                jac[row * n + ai + 1] = 2.0 * (ay - by);
                jac[row * n + bi] = -2.0 * (ax - bx);
                jac[row * n + bi + 1] = -2.0 * (ay - by);
            }
            1
        }
        ConstraintKind::Radius { curve, .. } => {
            if let Some(idx) = layout::radius_index(sketch, layout, *curve) {
                jac[row * n + idx] = 1.0;
            }
            1
        }
        ConstraintKind::Diameter { curve, .. } => {
            if let Some(idx) = layout::radius_index(sketch, layout, *curve) {
                jac[row * n + idx] = 1.0;
            }
            1
        }
        ConstraintKind::Concentric { entity_a, entity_b } => {
            if let (Some(a), Some(b)) = (
                layout::center_point_id(sketch, *entity_a).and_then(|p| layout.point_offset.get(&p).copied()),
                layout::center_point_id(sketch, *entity_b).and_then(|p| layout.point_offset.get(&p).copied()),
            ) {
                jac[row * n + a] = 1.0;
                jac[row * n + b] = -1.0;
                jac[(row + 1) * n + a + 1] = 1.0;
                jac[(row + 1) * n + b + 1] = -1.0;
            }
            2
        }
        _ => finite_difference_row(c, sketch, layout, params, n, jac, row),
    }
}

/// Central-difference Jacobian row(s) for constraint kinds with no
/// closed-form derivative (`Tangent`, `Equal`, `PointOnCurve`, `Angle`).
fn finite_difference_row(c: &Constraint, sketch: &Sketch, layout: &Layout, params: &[f64], n: usize, jac: &mut [f64], row: usize) -> usize {
    let mut base = Vec::new();
    constraint_residual(c, sketch, layout, params, &mut base);
    let rows = base.len().max(1);
    for j in 0..n {
        let mut perturbed = params.to_vec();
        perturbed[j] += FINITE_DIFFERENCE_STEP;
        let mut plus = Vec::new();
        constraint_residual(c, sketch, layout, &perturbed, &mut plus);
        for (ri, (b, p)) in base.iter().zip(plus.iter()).enumerate() {
            jac[(row + ri) * n + j] = (p - b) / FINITE_DIFFERENCE_STEP;
        }
    }
    rows
}

fn line_ys(sketch: &Sketch, layout: &Layout, params: &[f64], line: EntityId) -> Option<(f64, f64)> {
    let (s, e) = layout::line_endpoints(sketch, line)?;
    Some((layout::point_xy(layout, params, s)?.1, layout::point_xy(layout, params, e)?.1))
}

fn line_xs(sketch: &Sketch, layout: &Layout, params: &[f64], line: EntityId) -> Option<(f64, f64)> {
    let (s, e) = layout::line_endpoints(sketch, line)?;
    Some((layout::point_xy(layout, params, s)?.0, layout::point_xy(layout, params, e)?.0))
}

fn line_dir(sketch: &Sketch, layout: &Layout, params: &[f64], line: EntityId) -> Option<Vec2> {
    let (s, e) = layout::line_endpoints(sketch, line)?;
    let a = layout::point_xy(layout, params, s)?;
    let b = layout::point_xy(layout, params, e)?;
    Some(Vec2::new(b.0 - a.0, b.1 - a.1))
}

fn line_endpoints_xy(sketch: &Sketch, layout: &Layout, params: &[f64], line: EntityId) -> Option<(Vec2, Vec2)> {
    let (s, e) = layout::line_endpoints(sketch, line)?;
    Some((
        Vec2::new(layout::point_xy(layout, params, s)?.0, layout::point_xy(layout, params, s)?.1),
        Vec2::new(layout::point_xy(layout, params, e)?.0, layout::point_xy(layout, params, e)?.1),
    ))
}

fn curve_center_radius(sketch: &Sketch, layout: &Layout, params: &[f64], id: EntityId) -> Option<(Vec2, f64)> {
    let center = layout::center_point_id(sketch, id)?;
    let (cx, cy) = layout::point_xy(layout, params, center)?;
    let radius = params[layout::radius_index(sketch, layout, id)?];
    Some((Vec2::new(cx, cy), radius))
}

/// Line-to-circle/arc tangency via squared distance from center to line;
/// circle/arc-to-circle/arc tangency via squared center distance. Any other
/// pairing (e.g. two lines) has no tangency meaning and contributes no
/// constraint.
fn tangent_residual(sketch: &Sketch, layout: &Layout, params: &[f64], a: EntityId, b: EntityId) -> Option<f64> {
    if let Some((p0, p1)) = line_endpoints_xy(sketch, layout, params, a) {
        let (center, radius) = curve_center_radius(sketch, layout, params, b)?;
        return Some(line_circle_tangent_residual(p0, p1, center, radius));
    }
    if let Some((p0, p1)) = line_endpoints_xy(sketch, layout, params, b) {
        let (center, radius) = curve_center_radius(sketch, layout, params, a)?;
        return Some(line_circle_tangent_residual(p0, p1, center, radius));
    }
    let (ca, ra) = curve_center_radius(sketch, layout, params, a)?;
    let (cb, rb) = curve_center_radius(sketch, layout, params, b)?;
    Some(ca.distance_squared(cb) - (ra + rb).powi(2))
}

fn line_circle_tangent_residual(p0: Vec2, p1: Vec2, center: Vec2, radius: f64) -> f64 {
    let dir = p1 - p0;
    let len_sq = dir.length_squared().max(1e-20);
    let cross = dir.cross(center - p0);
    cross * cross / len_sq - radius * radius
}

/// `scalar_measure` used by `Equal`: length for lines, radius for
/// circles/arcs, major radius for ellipses.
fn scalar_measure(sketch: &Sketch, layout: &Layout, params: &[f64], id: EntityId) -> Option<f64> {
    if let Some((p0, p1)) = line_endpoints_xy(sketch, layout, params, id) {
        return Some(p0.distance(p1));
    }
    if let Some(idx) = layout::radius_index(sketch, layout, id) {
        return Some(params[idx]);
    }
    if let Some(idx) = layout.ellipse_offset.get(&id).copied() {
        return Some(params[idx]);
    }
    None
}

fn point_on_curve_residual(sketch: &Sketch, layout: &Layout, params: &[f64], point: EntityId, curve: EntityId) -> Option<f64> {
    let (px, py) = layout::point_xy(layout, params, point)?;
    if let Some((a, b)) = line_endpoints_xy(sketch, layout, params, curve) {
        return Some((px - a.x) * (b.y - a.y) - (py - a.y) * (b.x - a.x));
    }
    let (center, radius) = curve_center_radius(sketch, layout, params, curve)?;
    Some((px - center.x).powi(2) + (py - center.y).powi(2) - radius * radius)
}

fn line_pair_skew_jacobian(
    sketch: &Sketch,
    layout: &Layout,
    params: &[f64],
    line_a: EntityId,
    line_b: EntityId,
    n: usize,
    jac: &mut [f64],
    row: usize,
    dot: bool,
) {
    let (Some((sa, ea)), Some((sb, eb))) = (
        layout::line_endpoints(sketch, line_a),
        layout::line_endpoints(sketch, line_b),
    ) else {
        return;
    };
    let (Some(dir_a), Some(dir_b)) = (line_dir(sketch, layout, params, line_a), line_dir(sketch, layout, params, line_b)) else {
        return;
    };
    let (Some(sai), Some(eai), Some(sbi), Some(ebi)) = (
        layout.point_offset.get(&sa).copied(),
        layout.point_offset.get(&ea).copied(),
        layout.point_offset.get(&sb).copied(),
        layout.point_offset.get(&eb).copied(),
    ) else {
        return;
    };
    // r = cross(dir_a, dir_b) for Parallel, dot(dir_a, dir_b) for Perpendicular.
    let (dxb, dyb, dxa, dya) = (dir_b.x, dir_b.y, dir_a.x, dir_a.y);
    if dot {
        jac[row * n + sai] += -dxb;
        jac[row * n + eai] += dxb;
        jac[row * n + sai + 1] += -dyb;
        jac[row * n + eai + 1] += dyb;
        jac[row * n + sbi] += -dxa;
        jac[row * n + ebi] += dxa;
        jac[row * n + sbi + 1] += -dya;
        jac[row * n + ebi + 1] += dya;
    } else {
        jac[row * n + sai] += -dyb;
        jac[row * n + eai] += dyb;
        jac[row * n + sai + 1] += dxb;
        jac[row * n + eai + 1] += -dxb;
        jac[row * n + sbi] += dya;
        jac[row * n + ebi] += -dya;
        jac[row * n + sbi + 1] += -dxa;
        jac[row * n + ebi + 1] += dxa;
    }
}
