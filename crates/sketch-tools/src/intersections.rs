//! Automatic intersection-point materialization and entity splitting,
//! grounded on `IntersectionManager`: after a tool commits a new curve, scan
//! existing edge-like entities for crossings, create or reuse a point at
//! each, and split every crossed entity (descending parameter order keeps
//! earlier splits' IDs stable while later ones still reference the original
//! curve). Circles are never split; they are closed.

use sketch_store::{EntityId, EntityKind, EntityShape, Sketch};
use waffle_types::Vec2;

/// Intersection points closer together than this are merged into one.
pub const MIN_POINT_SPACING: f64 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct IntersectionResult {
    pub points_created: usize,
    pub entities_split: usize,
    pub new_segments: Vec<EntityId>,
    pub intersection_points: Vec<Vec2>,
}

#[derive(Debug, Clone)]
pub struct IntersectionManager {
    enabled: bool,
    min_point_spacing: f64,
}

impl Default for IntersectionManager {
    fn default() -> Self {
        Self {
            enabled: true,
            min_point_spacing: MIN_POINT_SPACING,
        }
    }
}

impl IntersectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_minimum_point_spacing(&mut self, spacing: f64) {
        self.min_point_spacing = spacing;
    }

    /// Processes intersections between `new_entity_id` and every other
    /// edge-like entity already in the sketch.
    pub fn process_intersections(&self, new_entity_id: EntityId, sketch: &mut Sketch) -> IntersectionResult {
        let mut result = IntersectionResult::default();
        if !self.enabled {
            return result;
        }
        let Some(new_entity) = sketch.get_entity(new_entity_id).cloned() else {
            return result;
        };

        // Snapshot every other edge-like entity before any mutation. Crossing
        // positions are computed once against this pristine snapshot so that
        // splitting one entity can't introduce an artifact endpoint that the
        // next entity's intersection test then mistakes for a second crossing.
        let others: Vec<(EntityId, sketch_store::Entity)> = sketch
            .entities()
            .filter(|e| e.id != new_entity_id && is_edge_like(e.kind()))
            .map(|e| (e.id, e.clone()))
            .collect();

        // Points that already exist before this call started: a crossing
        // landing on one of these means the two entities already meet there,
        // not that a split is needed. This is checked once, up front, so that
        // a point created by splitting `other` isn't mistaken for a
        // pre-existing vertex when we get to splitting `new_entity` at the
        // same location a few lines down.
        let pre_existing_points: Vec<Vec2> = sketch
            .entities()
            .filter(|e| e.kind() == EntityKind::Point)
            .filter_map(|e| e.as_point())
            .map(|(x, y)| Vec2::new(x, y))
            .collect();
        let already_there = |p: Vec2| pre_existing_points.iter().any(|q| q.distance(p) <= self.min_point_spacing);

        let mut new_entity_crossings = Vec::new();

        // For every other entity, collect the split positions that fall
        // strictly inside it, then split in descending parameter order so
        // earlier splits don't invalidate later ones.
        for (other_id, other) in &others {
            let raw = find_intersections(&new_entity, other, sketch);
            if raw.is_empty() {
                continue;
            }
            let merged = merge_nearby_points(raw, self.min_point_spacing);
            result.intersection_points.extend(merged.iter().copied());
            new_entity_crossings.extend(merged.iter().copied());

            let mut params: Vec<(f64, Vec2)> = merged
                .into_iter()
                .filter(|p| !already_there(*p))
                .filter_map(|p| param_of(other, p, sketch).map(|t| (t, p)))
                .collect();
            params.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

            let positions: Vec<Vec2> = params.into_iter().map(|(_, p)| p).collect();
            self.split_chain(sketch, *other_id, &positions, &mut result);
        }

        // Also split the newly created entity itself at every point where an
        // existing entity crosses it, using the same pristine crossing
        // positions (same param-descending discipline).
        let merged = merge_nearby_points(new_entity_crossings, self.min_point_spacing);
        let mut params: Vec<(f64, Vec2)> = merged
            .into_iter()
            .filter(|p| !already_there(*p))
            .filter_map(|p| param_of(&new_entity, p, sketch).map(|t| (t, p)))
            .collect();
        params.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        let positions: Vec<Vec2> = params.into_iter().map(|(_, p)| p).collect();
        self.split_chain(sketch, new_entity_id, &positions, &mut result);

        result
    }

    /// Splits `entity_id` at every position in `positions` (already sorted by
    /// descending parameter). Each split replaces the entity with a left/right
    /// pair; since every remaining position has a smaller parameter than the
    /// one just split off, it always falls within the left-hand piece, so the
    /// chain continues there.
    fn split_chain(&self, sketch: &mut Sketch, mut entity_id: EntityId, positions: &[Vec2], result: &mut IntersectionResult) {
        for &pos in positions {
            match split_entity_at(sketch, entity_id, pos) {
                Some((left, right)) => {
                    result.entities_split += 1;
                    result.points_created += 1;
                    result.new_segments.push(left);
                    result.new_segments.push(right);
                    entity_id = left;
                }
                None => continue,
            }
        }
    }
}

fn is_edge_like(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Line | EntityKind::Arc)
}

fn split_entity_at(sketch: &mut Sketch, id: EntityId, pos: Vec2) -> Option<(EntityId, EntityId)> {
    let kind = sketch.get_entity(id)?.kind();
    match kind {
        EntityKind::Line => sketch.split_line_at(id, pos),
        EntityKind::Arc => {
            let center = match &sketch.get_entity(id)?.shape {
                EntityShape::Arc { center, .. } => *center,
                _ => return None,
            };
            let (cx, cy) = sketch.get_entity(center)?.as_point()?;
            let angle = (pos.y - cy).atan2(pos.x - cx);
            sketch.split_arc_at(id, angle)
        }
        _ => None,
    }
}

fn param_of(entity: &sketch_store::Entity, pos: Vec2, sketch: &Sketch) -> Option<f64> {
    match &entity.shape {
        EntityShape::Line { start, end } => {
            let (sx, sy) = sketch.get_entity(*start)?.as_point()?;
            let (ex, ey) = sketch.get_entity(*end)?.as_point()?;
            let s = Vec2::new(sx, sy);
            let e = Vec2::new(ex, ey);
            let dir = e - s;
            let len_sq = dir.length_squared();
            if len_sq < 1e-20 {
                return None;
            }
            Some((pos - s).dot(dir) / len_sq)
        }
        EntityShape::Arc { center, start_angle, end_angle, .. } => {
            let (cx, cy) = sketch.get_entity(*center)?.as_point()?;
            let angle = (pos.y - cy).atan2(pos.x - cx);
            let sweep = waffle_types::normalize_sweep(*start_angle, *end_angle);
            if sweep < 1e-12 {
                return None;
            }
            Some(waffle_types::normalize_sweep(*start_angle, angle) / sweep)
        }
        _ => None,
    }
}

fn merge_nearby_points(mut points: Vec<Vec2>, tolerance: f64) -> Vec<Vec2> {
    let mut merged: Vec<Vec2> = Vec::new();
    points.retain(|p| p.x.is_finite() && p.y.is_finite());
    'outer: for p in points {
        for m in &merged {
            if m.distance(p) <= tolerance {
                continue 'outer;
            }
        }
        merged.push(p);
    }
    merged
}

/// Finds every intersection point between two edge-like entities, excluding
/// the shared endpoint of entities that already meet at a common point.
fn find_intersections(a: &sketch_store::Entity, b: &sketch_store::Entity, sketch: &Sketch) -> Vec<Vec2> {
    let pts = match (&a.shape, &b.shape) {
        (EntityShape::Line { start: s1, end: e1 }, EntityShape::Line { start: s2, end: e2 }) => {
            let (Some(p1), Some(p2), Some(p3), Some(p4)) = (
                sketch.get_entity(*s1).and_then(|e| e.as_point()),
                sketch.get_entity(*e1).and_then(|e| e.as_point()),
                sketch.get_entity(*s2).and_then(|e| e.as_point()),
                sketch.get_entity(*e2).and_then(|e| e.as_point()),
            ) else {
                return Vec::new();
            };
            line_line(
                Vec2::new(p1.0, p1.1),
                Vec2::new(p2.0, p2.1),
                Vec2::new(p3.0, p3.1),
                Vec2::new(p4.0, p4.1),
            )
        }
        (EntityShape::Line { start, end }, EntityShape::Arc { center, radius, start_angle, end_angle })
        | (EntityShape::Arc { center, radius, start_angle, end_angle }, EntityShape::Line { start, end }) => {
            let (Some(p1), Some(p2), Some(c)) = (
                sketch.get_entity(*start).and_then(|e| e.as_point()),
                sketch.get_entity(*end).and_then(|e| e.as_point()),
                sketch.get_entity(*center).and_then(|e| e.as_point()),
            ) else {
                return Vec::new();
            };
            line_arc(
                Vec2::new(p1.0, p1.1),
                Vec2::new(p2.0, p2.1),
                Vec2::new(c.0, c.1),
                *radius,
                *start_angle,
                *end_angle,
            )
        }
        (
            EntityShape::Arc { center: c1, radius: r1, start_angle: sa1, end_angle: ea1 },
            EntityShape::Arc { center: c2, radius: r2, start_angle: sa2, end_angle: ea2 },
        ) => {
            let (Some(p1), Some(p2)) = (
                sketch.get_entity(*c1).and_then(|e| e.as_point()),
                sketch.get_entity(*c2).and_then(|e| e.as_point()),
            ) else {
                return Vec::new();
            };
            arc_arc(
                Vec2::new(p1.0, p1.1),
                *r1,
                *sa1,
                *ea1,
                Vec2::new(p2.0, p2.1),
                *r2,
                *sa2,
                *ea2,
            )
        }
        _ => Vec::new(),
    };

    // Drop points coincident with a shared endpoint: those represent entities
    // that already meet, not a new crossing to materialize.
    let shared: Vec<Vec2> = a
        .references()
        .into_iter()
        .filter(|id| b.references().contains(id))
        .filter_map(|id| sketch.get_entity(id).and_then(|e| e.as_point()))
        .map(|(x, y)| Vec2::new(x, y))
        .collect();
    pts.into_iter().filter(|p| !shared.iter().any(|s| s.distance(*p) < 1e-6)).collect()
}

fn line_line(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Vec<Vec2> {
    let d1 = a2 - a1;
    let d2 = b2 - b1;
    let denom = d1.cross(d2);
    if denom.abs() < 1e-12 {
        return Vec::new();
    }
    let t1 = (b1 - a1).cross(d2) / denom;
    let t2 = (b1 - a1).cross(d1) / denom;
    if (0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2) {
        vec![a1.lerp(a2, t1)]
    } else {
        Vec::new()
    }
}

fn line_circle(a1: Vec2, a2: Vec2, center: Vec2, radius: f64) -> Vec<(f64, Vec2)> {
    let d = a2 - a1;
    let f = a1 - center;
    let a = d.dot(d);
    if a < 1e-20 {
        return Vec::new();
    }
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    [t1, t2]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .map(|t| (t, a1.lerp(a2, t)))
        .collect()
}

fn angle_in_sweep(angle: f64, start_angle: f64, end_angle: f64) -> bool {
    let sweep = waffle_types::normalize_sweep(start_angle, end_angle);
    let rel = waffle_types::normalize_sweep(start_angle, angle);
    rel <= sweep + 1e-9
}

fn line_arc(p1: Vec2, p2: Vec2, center: Vec2, radius: f64, start_angle: f64, end_angle: f64) -> Vec<Vec2> {
    line_circle(p1, p2, center, radius)
        .into_iter()
        .map(|(_, p)| p)
        .filter(|p| angle_in_sweep((p.y - center.y).atan2(p.x - center.x), start_angle, end_angle))
        .collect()
}

fn arc_arc(
    c1: Vec2,
    r1: f64,
    sa1: f64,
    ea1: f64,
    c2: Vec2,
    r2: f64,
    sa2: f64,
    ea2: f64,
) -> Vec<Vec2> {
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
    let offset = (c2 - c1).perp().normalized() * h;
    [mid + offset, mid - offset]
        .into_iter()
        .filter(|p| {
            angle_in_sweep((p.y - c1.y).atan2(p.x - c1.x), sa1, ea1)
                && angle_in_sweep((p.y - c2.y).atan2(p.x - c2.x), sa2, ea2)
        })
        .collect()
}
