//! Snap candidate resolution for the sketch editor's cursor: the geometric
//! finders that turn a raw cursor position into a prioritized snap, grounded
//! on `SnapManager`. Eight core geometric snap types get full finders
//! (Vertex, Endpoint, Midpoint, Center, Quadrant, Intersection, OnCurve,
//! Grid); the remaining enum variants (Perpendicular, Tangent, Horizontal,
//! Vertical, SketchGuide) are recognized but not yet backed by a finder, and
//! `ActiveLayer3D` is served by [`SnapResolver::set_external_geometry`].

mod geometry;
mod spatial_hash;
mod types;

pub use types::{SnapResult, SnapType};

use sketch_store::{EntityId, EntityKind, Sketch};
use spatial_hash::SpatialHash;
use waffle_types::Vec2;

/// A piece of geometry fed in from outside the sketch (e.g. a projected edge
/// of active 3D-layer geometry), available for `ActiveLayer3D` snapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalCurve {
    Line { a: Vec2, b: Vec2 },
    Circle { center: Vec2, radius: f64 },
}

#[derive(Debug, Clone)]
pub struct SnapConfig {
    pub enabled: bool,
    pub radius: f64,
    pub grid_size: f64,
    pub vertex_enabled: bool,
    pub midpoint_enabled: bool,
    pub center_enabled: bool,
    pub quadrant_enabled: bool,
    pub intersection_enabled: bool,
    pub on_curve_enabled: bool,
    pub grid_enabled: bool,
    pub external_enabled: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 0.15,
            grid_size: 1.0,
            vertex_enabled: true,
            midpoint_enabled: true,
            center_enabled: true,
            quadrant_enabled: true,
            intersection_enabled: true,
            on_curve_enabled: true,
            grid_enabled: true,
            external_enabled: true,
        }
    }
}

/// Resolves a cursor position to the highest-priority nearby snap. Caches a
/// point spatial hash across calls, rebuilt only when the sketch's entity
/// count changes.
pub struct SnapResolver {
    pub config: SnapConfig,
    hash: SpatialHash,
    external: Vec<ExternalCurve>,
    last_candidates: Vec<SnapResult>,
    ambiguity_index: usize,
}

impl Default for SnapResolver {
    fn default() -> Self {
        Self::new(SnapConfig::default())
    }
}

impl SnapResolver {
    pub fn new(config: SnapConfig) -> Self {
        let hash = SpatialHash::new(config.grid_size.max(config.radius));
        Self {
            config,
            hash,
            external: Vec::new(),
            last_candidates: Vec::new(),
            ambiguity_index: 0,
        }
    }

    pub fn set_external_geometry(&mut self, geometry: Vec<ExternalCurve>) {
        self.external = geometry;
    }

    fn refresh_hash(&mut self, sketch: &Sketch) {
        let points = sketch
            .entities()
            .filter(|e| e.kind() == EntityKind::Point)
            .filter_map(|e| e.as_point().map(|(x, y)| (e.id, Vec2::new(x, y))));
        self.hash.refresh(sketch, points);
    }

    /// All candidates within `config.radius` of `cursor`, sorted best-first.
    /// Also updates the ambiguity state: call [`Self::has_ambiguity`] /
    /// [`Self::cycle_ambiguity`] afterward to let the caller disambiguate
    /// between several equally-close candidates (e.g. a vertex sitting on
    /// top of an intersection).
    pub fn find_all_snaps(&mut self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        if !self.config.enabled {
            self.last_candidates.clear();
            self.ambiguity_index = 0;
            return Vec::new();
        }
        self.refresh_hash(sketch);

        let mut candidates = Vec::new();
        if self.config.vertex_enabled {
            candidates.extend(self.find_vertex_snaps(sketch, cursor));
            candidates.extend(self.find_endpoint_snaps(sketch, cursor));
        }
        if self.config.midpoint_enabled {
            candidates.extend(self.find_midpoint_snaps(sketch, cursor));
        }
        if self.config.center_enabled {
            candidates.extend(self.find_center_snaps(sketch, cursor));
        }
        if self.config.quadrant_enabled {
            candidates.extend(self.find_quadrant_snaps(sketch, cursor));
        }
        if self.config.intersection_enabled {
            candidates.extend(self.find_intersection_snaps(sketch, cursor));
        }
        if self.config.on_curve_enabled {
            candidates.extend(self.find_on_curve_snaps(sketch, cursor));
        }
        if self.config.external_enabled {
            candidates.extend(self.find_external_snaps(cursor));
        }
        if self.config.grid_enabled {
            candidates.extend(self.find_grid_snaps(cursor));
        }

        candidates.retain(|c| c.distance <= self.config.radius);
        candidates.sort_by(|a, b| {
            if a.snap_type != b.snap_type {
                a.snap_type.cmp(&b.snap_type)
            } else {
                a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal)
            }
        });

        self.last_candidates = candidates.clone();
        self.ambiguity_index = 0;
        candidates
    }

    pub fn find_best_snap(&mut self, sketch: &Sketch, cursor: Vec2) -> SnapResult {
        self.find_all_snaps(sketch, cursor)
            .into_iter()
            .next()
            .unwrap_or_else(SnapResult::none)
    }

    /// True when the last [`Self::find_all_snaps`] call found more than one
    /// candidate, i.e. the cursor is near overlapping snap targets.
    pub fn has_ambiguity(&self) -> bool {
        self.last_candidates.len() > 1
    }

    pub fn ambiguity_candidate_count(&self) -> usize {
        self.last_candidates.len()
    }

    /// Advances to the next candidate from the last resolve (wrapping), for
    /// a caller that lets the user cycle through overlapping snaps with a
    /// key press. Returns `None` if there's nothing to cycle through.
    pub fn cycle_ambiguity(&mut self) -> Option<&SnapResult> {
        if self.last_candidates.is_empty() {
            return None;
        }
        self.ambiguity_index = (self.ambiguity_index + 1) % self.last_candidates.len();
        self.last_candidates.get(self.ambiguity_index)
    }

    pub fn clear_ambiguity(&mut self) {
        self.ambiguity_index = 0;
    }

    // -- finders --------------------------------------------------------

    /// Freestanding points: sketch points that are not an endpoint or center
    /// of any other entity. Points that do belong to a line/arc are reported
    /// by [`Self::find_endpoint_snaps`] / [`Self::find_center_snaps`]
    /// instead, so a given point never competes with itself under two
    /// different priorities.
    fn find_vertex_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        self.hash
            .query(cursor, self.config.radius)
            .into_iter()
            .filter(|(id, _)| is_freestanding_point(sketch, *id))
            .map(|(id, pos)| SnapResult::new(SnapType::Vertex, pos, cursor.distance(pos)).with_point(id).with_entity(id))
            .collect()
    }

    /// Endpoints of lines.
    fn find_endpoint_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for entity in sketch.entities() {
            match entity.shape {
                sketch_store::EntityShape::Line { start, end } => {
                    for pid in [start, end] {
                        if let Some((x, y)) = sketch.get_entity(pid).and_then(|e| e.as_point()) {
                            let pos = Vec2::new(x, y);
                            let d = cursor.distance(pos);
                            if d <= self.config.radius {
                                out.push(
                                    SnapResult::new(SnapType::Endpoint, pos, d)
                                        .with_entity(entity.id)
                                        .with_point(pid),
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn find_midpoint_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for entity in sketch.entities() {
            if let sketch_store::EntityShape::Line { start, end } = entity.shape {
                let (Some((ax, ay)), Some((bx, by))) = (
                    sketch.get_entity(start).and_then(|e| e.as_point()),
                    sketch.get_entity(end).and_then(|e| e.as_point()),
                ) else {
                    continue;
                };
                let mid = Vec2::new(ax, ay).lerp(Vec2::new(bx, by), 0.5);
                let d = cursor.distance(mid);
                if d <= self.config.radius {
                    out.push(SnapResult::new(SnapType::Midpoint, mid, d).with_entity(entity.id));
                }
            }
        }
        out
    }

    fn find_center_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for entity in sketch.entities() {
            let center_id = match entity.shape {
                sketch_store::EntityShape::Circle { center, .. } => Some(center),
                sketch_store::EntityShape::Arc { center, .. } => Some(center),
                sketch_store::EntityShape::Ellipse { center, .. } => Some(center),
                _ => None,
            };
            let Some(center_id) = center_id else { continue };
            if let Some((x, y)) = sketch.get_entity(center_id).and_then(|e| e.as_point()) {
                let pos = Vec2::new(x, y);
                let d = cursor.distance(pos);
                if d <= self.config.radius {
                    out.push(
                        SnapResult::new(SnapType::Center, pos, d)
                            .with_entity(entity.id)
                            .with_point(center_id),
                    );
                }
            }
        }
        out
    }

    fn find_quadrant_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for entity in sketch.entities() {
            let (center_id, radius) = match entity.shape {
                sketch_store::EntityShape::Circle { center, radius } => (center, radius),
                sketch_store::EntityShape::Arc { center, radius, .. } => (center, radius),
                _ => continue,
            };
            let Some((cx, cy)) = sketch.get_entity(center_id).and_then(|e| e.as_point()) else {
                continue;
            };
            let c = Vec2::new(cx, cy);
            for angle in [0.0, std::f64::consts::FRAC_PI_2, std::f64::consts::PI, 3.0 * std::f64::consts::FRAC_PI_2] {
                let pos = c + Vec2::new(angle.cos(), angle.sin()) * radius;
                let d = cursor.distance(pos);
                if d <= self.config.radius {
                    out.push(SnapResult::new(SnapType::Quadrant, pos, d).with_entity(entity.id));
                }
            }
        }
        out
    }

    fn find_intersection_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let entities: Vec<_> = sketch.entities().collect();
        let mut out = Vec::new();
        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                let points = curve_curve_intersections(sketch, entities[i], entities[j]);
                for pos in points {
                    let d = cursor.distance(pos);
                    if d <= self.config.radius {
                        out.push(
                            SnapResult::new(SnapType::Intersection, pos, d)
                                .with_entity(entities[i].id)
                                .with_second_entity(entities[j].id),
                        );
                    }
                }
            }
        }
        out
    }

    fn find_on_curve_snaps(&self, sketch: &Sketch, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for entity in sketch.entities() {
            let projected = match entity.shape {
                sketch_store::EntityShape::Line { start, end } => {
                    let (Some((ax, ay)), Some((bx, by))) = (
                        sketch.get_entity(start).and_then(|e| e.as_point()),
                        sketch.get_entity(end).and_then(|e| e.as_point()),
                    ) else {
                        continue;
                    };
                    Some(geometry::nearest_point_on_line(cursor, Vec2::new(ax, ay), Vec2::new(bx, by)))
                }
                sketch_store::EntityShape::Circle { center, radius } => {
                    sketch.get_entity(center).and_then(|e| e.as_point()).map(|(cx, cy)| {
                        geometry::nearest_point_on_circle(cursor, Vec2::new(cx, cy), radius)
                    })
                }
                sketch_store::EntityShape::Arc { center, radius, .. } => {
                    sketch.get_entity(center).and_then(|e| e.as_point()).map(|(cx, cy)| {
                        geometry::nearest_point_on_circle(cursor, Vec2::new(cx, cy), radius)
                    })
                }
                _ => None,
            };
            if let Some(pos) = projected {
                let d = cursor.distance(pos);
                if d <= self.config.radius {
                    out.push(SnapResult::new(SnapType::OnCurve, pos, d).with_entity(entity.id));
                }
            }
        }
        out
    }

    fn find_external_snaps(&self, cursor: Vec2) -> Vec<SnapResult> {
        let mut out = Vec::new();
        for curve in &self.external {
            let pos = match curve {
                ExternalCurve::Line { a, b } => geometry::nearest_point_on_line(cursor, *a, *b),
                ExternalCurve::Circle { center, radius } => geometry::nearest_point_on_circle(cursor, *center, *radius),
            };
            let d = cursor.distance(pos);
            if d <= self.config.radius {
                out.push(SnapResult::new(SnapType::ActiveLayer3D, pos, d));
            }
        }
        out
    }

    fn find_grid_snaps(&self, cursor: Vec2) -> Vec<SnapResult> {
        let g = self.config.grid_size;
        if g <= 0.0 {
            return Vec::new();
        }
        let pos = Vec2::new((cursor.x / g).round() * g, (cursor.y / g).round() * g);
        vec![SnapResult::new(SnapType::Grid, pos, cursor.distance(pos))]
    }
}

fn is_freestanding_point(sketch: &Sketch, id: EntityId) -> bool {
    sketch
        .get_entity(id)
        .and_then(|e| e.connected_entities())
        .map(|c| c.is_empty())
        .unwrap_or(true)
}

fn curve_curve_intersections(sketch: &Sketch, a: &sketch_store::Entity, b: &sketch_store::Entity) -> Vec<Vec2> {
    use sketch_store::EntityShape::*;

    let line_pts = |start: EntityId, end: EntityId| -> Option<(Vec2, Vec2)> {
        let (sx, sy) = sketch.get_entity(start)?.as_point()?;
        let (ex, ey) = sketch.get_entity(end)?.as_point()?;
        Some((Vec2::new(sx, sy), Vec2::new(ex, ey)))
    };
    let circle_like = |center: EntityId, radius: f64| -> Option<(Vec2, f64)> {
        let (cx, cy) = sketch.get_entity(center)?.as_point()?;
        Some((Vec2::new(cx, cy), radius))
    };

    match (&a.shape, &b.shape) {
        (Line { start: s1, end: e1 }, Line { start: s2, end: e2 }) => {
            let (Some((p1, p2)), Some((p3, p4))) = (line_pts(*s1, *e1), line_pts(*s2, *e2)) else {
                return Vec::new();
            };
            geometry::line_line_intersection(p1, p2, p3, p4).into_iter().collect()
        }
        (Line { start, end }, Circle { center, radius }) | (Circle { center, radius }, Line { start, end }) => {
            let (Some((p1, p2)), Some((c, r))) = (line_pts(*start, *end), circle_like(*center, *radius)) else {
                return Vec::new();
            };
            geometry::line_circle_intersection(p1, p2, c, r)
        }
        (Line { start, end }, Arc { center, radius, .. }) | (Arc { center, radius, .. }, Line { start, end }) => {
            let (Some((p1, p2)), Some((c, r))) = (line_pts(*start, *end), circle_like(*center, *radius)) else {
                return Vec::new();
            };
            geometry::line_circle_intersection(p1, p2, c, r)
        }
        (Circle { center: c1, radius: r1 }, Circle { center: c2, radius: r2 }) => {
            let (Some((c1, r1)), Some((c2, r2))) = (circle_like(*c1, *r1), circle_like(*c2, *r2)) else {
                return Vec::new();
            };
            geometry::circle_circle_intersection(c1, r1, c2, r2)
        }
        (Circle { center: c1, radius: r1 }, Arc { center: c2, radius: r2, .. })
        | (Arc { center: c1, radius: r1, .. }, Circle { center: c2, radius: r2 }) => {
            let (Some((c1, r1)), Some((c2, r2))) = (circle_like(*c1, *r1), circle_like(*c2, *r2)) else {
                return Vec::new();
            };
            geometry::circle_circle_intersection(c1, r1, c2, r2)
        }
        (Arc { center: c1, radius: r1, .. }, Arc { center: c2, radius: r2, .. }) => {
            let (Some((c1, r1)), Some((c2, r2))) = (circle_like(*c1, *r1), circle_like(*c2, *r2)) else {
                return Vec::new();
            };
            geometry::circle_circle_intersection(c1, r1, c2, r2)
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_snap_picks_nearest_point() {
        let mut sketch = Sketch::new();
        sketch.add_point(0.0, 0.0, false);
        sketch.add_point(5.0, 5.0, false);
        let mut resolver = SnapResolver::default();
        let best = resolver.find_best_snap(&sketch, Vec2::new(0.02, -0.01));
        assert_eq!(best.snap_type, SnapType::Vertex);
        assert!(best.position.distance(Vec2::ZERO) < 1e-9);
    }

    #[test]
    fn endpoint_beats_midpoint_on_same_line() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        sketch.add_line(p0, p1, false).unwrap();
        let mut resolver = SnapResolver::default();
        let best = resolver.find_best_snap(&sketch, Vec2::new(0.05, 0.0));
        assert_eq!(best.snap_type, SnapType::Endpoint);
    }

    #[test]
    fn grid_snap_is_fallback_when_nothing_else_nearby() {
        let sketch = Sketch::new();
        let mut resolver = SnapResolver::default();
        resolver.config.grid_size = 1.0;
        let best = resolver.find_best_snap(&sketch, Vec2::new(3.4, 3.6));
        assert_eq!(best.snap_type, SnapType::Grid);
        assert!((best.position.x - 3.0).abs() < 1e-9);
        assert!((best.position.y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn intersection_snap_finds_line_crossing() {
        let mut sketch = Sketch::new();
        let a0 = sketch.add_point(-5.0, 0.0, false);
        let a1 = sketch.add_point(5.0, 0.0, false);
        let b0 = sketch.add_point(0.0, -5.0, false);
        let b1 = sketch.add_point(0.0, 5.0, false);
        sketch.add_line(a0, a1, false).unwrap();
        sketch.add_line(b0, b1, false).unwrap();
        let mut resolver = SnapResolver::default();
        let all = resolver.find_all_snaps(&sketch, Vec2::new(0.01, 0.01));
        assert!(all.iter().any(|s| s.snap_type == SnapType::Intersection));
    }

    #[test]
    fn ambiguity_cycles_through_overlapping_candidates() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        let p2 = sketch.add_point(0.0, 10.0, false);
        sketch.add_line(p0, p1, false).unwrap();
        sketch.add_line(p0, p2, false).unwrap();
        let mut resolver = SnapResolver::default();
        resolver.find_all_snaps(&sketch, Vec2::new(0.01, 0.01));
        assert!(resolver.has_ambiguity());
        let first = resolver.cycle_ambiguity().cloned();
        let second = resolver.cycle_ambiguity().cloned();
        assert!(first.is_some() && second.is_some());
    }

    #[test]
    fn external_geometry_is_snappable() {
        let sketch = Sketch::new();
        let mut resolver = SnapResolver::default();
        resolver.set_external_geometry(vec![ExternalCurve::Line {
            a: Vec2::new(-5.0, 2.0),
            b: Vec2::new(5.0, 2.0),
        }]);
        let best = resolver.find_best_snap(&sketch, Vec2::new(0.0, 2.02));
        assert_eq!(best.snap_type, SnapType::ActiveLayer3D);
    }
}
