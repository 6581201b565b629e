//! Automatic constraint inference, grounded on `AutoConstrainer`: as a tool
//! commits new geometry, guess which constraints the user probably meant and
//! offer them for auto-apply above a confidence threshold.

use sketch_store::{ConstraintKind, EntityId, EntityKind, Sketch};
use waffle_types::Vec2;

const MIN_GEOMETRY_SIZE: f64 = 1e-6;
const ANGLE_TOLERANCE: f64 = 3.0_f64.to_radians();
const COINCIDENT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct AutoConstrainerConfig {
    pub enabled: bool,
    pub auto_apply_threshold: f64,
}

impl Default for AutoConstrainerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_apply_threshold: 0.75,
        }
    }
}

/// A constraint the auto-constrainer thinks should be applied, along with how
/// confident it is; callers filter by [`AutoConstrainer::filter_for_auto_apply`]
/// before actually calling [`Sketch::add_constraint`].
#[derive(Debug, Clone, PartialEq)]
pub struct InferredConstraint {
    pub kind: ConstraintKind,
    pub confidence: f64,
}

/// Context a tool passes in so inference can see what's being drawn; mirrors
/// the previous-entity/polyline-mode bookkeeping the Line tool threads
/// through every commit.
#[derive(Debug, Clone, Default)]
pub struct DrawingContext {
    pub active_entity: Option<EntityId>,
    pub previous_entity: Option<EntityId>,
    pub is_polyline_mode: bool,
}

#[derive(Debug, Clone)]
pub struct AutoConstrainer {
    config: AutoConstrainerConfig,
}

impl Default for AutoConstrainer {
    fn default() -> Self {
        Self {
            config: AutoConstrainerConfig::default(),
        }
    }
}

impl AutoConstrainer {
    pub fn new(config: AutoConstrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AutoConstrainerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AutoConstrainerConfig) {
        self.config = config;
    }

    /// Infers constraints for a just-committed line between `start`/`end`.
    /// Horizontal/vertical take priority; perpendicular/parallel against the
    /// previous polyline segment are only offered when neither axis fits.
    /// Endpoint coincidence is always checked independently.
    pub fn infer_line_constraints(
        &self,
        start: Vec2,
        end: Vec2,
        line_id: EntityId,
        sketch: &Sketch,
        context: &DrawingContext,
    ) -> Vec<InferredConstraint> {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut results = Vec::new();
        if start.distance(end) < MIN_GEOMETRY_SIZE {
            return results;
        }

        let mut has_orientation = false;
        if let Some(c) = infer_horizontal(start, end, line_id) {
            results.push(c);
            has_orientation = true;
        }
        if let Some(c) = infer_vertical(start, end, line_id) {
            results.push(c);
            has_orientation = true;
        }
        if !has_orientation {
            if let Some(c) = infer_perpendicular(start, end, line_id, sketch, context) {
                results.push(c);
            } else if let Some(c) = infer_parallel(start, end, line_id, sketch, context) {
                results.push(c);
            }
        }
        if let Some(c) = infer_coincident(end, line_id, sketch) {
            results.push(c);
        }
        results
    }

    /// Infers constraints for a just-committed circle: coincidence of its
    /// center, concentricity, and equal-radius against existing circles/arcs.
    pub fn infer_circle_constraints(&self, center: Vec2, radius: f64, circle_id: EntityId, sketch: &Sketch) -> Vec<InferredConstraint> {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut results = Vec::new();
        if let Some(c) = infer_coincident(center, circle_id, sketch) {
            results.push(c);
        }
        if let Some(c) = infer_concentric(center, circle_id, sketch) {
            results.push(c);
        }
        if let Some(c) = infer_equal_radius(radius, circle_id, sketch) {
            results.push(c);
        }
        results
    }

    /// Infers constraints for a just-committed arc: tangency to a line at the
    /// arc's start point, concentricity, and equal-radius.
    pub fn infer_arc_constraints(
        &self,
        center: Vec2,
        radius: f64,
        start_angle: f64,
        arc_id: EntityId,
        sketch: &Sketch,
    ) -> Vec<InferredConstraint> {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut results = Vec::new();
        let arc_start = center + Vec2::new(start_angle.cos(), start_angle.sin()) * radius;
        if let Some(c) = infer_tangent(arc_start, arc_id, sketch) {
            results.push(c);
        }
        if let Some(c) = infer_concentric(center, arc_id, sketch) {
            results.push(c);
        }
        if let Some(c) = infer_equal_radius(radius, arc_id, sketch) {
            results.push(c);
        }
        results
    }

    pub fn filter_for_auto_apply(&self, constraints: &[InferredConstraint]) -> Vec<InferredConstraint> {
        constraints
            .iter()
            .filter(|c| c.confidence >= self.config.auto_apply_threshold)
            .cloned()
            .collect()
    }
}

fn infer_horizontal(start: Vec2, end: Vec2, line: EntityId) -> Option<InferredConstraint> {
    let d = end - start;
    let angle = d.y.atan2(d.x).abs();
    let off_axis = angle.min((std::f64::consts::PI - angle).abs());
    (off_axis <= ANGLE_TOLERANCE).then(|| InferredConstraint {
        kind: ConstraintKind::Horizontal { line },
        confidence: 1.0 - off_axis / ANGLE_TOLERANCE * 0.3,
    })
}

fn infer_vertical(start: Vec2, end: Vec2, line: EntityId) -> Option<InferredConstraint> {
    let d = end - start;
    let angle = (std::f64::consts::FRAC_PI_2 - d.y.atan2(d.x).abs()).abs();
    (angle <= ANGLE_TOLERANCE).then(|| InferredConstraint {
        kind: ConstraintKind::Vertical { line },
        confidence: 1.0 - angle / ANGLE_TOLERANCE * 0.3,
    })
}

fn other_lines<'a>(sketch: &'a Sketch, exclude: EntityId) -> impl Iterator<Item = (EntityId, Vec2, Vec2)> + 'a {
    sketch.entities().filter(move |e| e.id != exclude && e.kind() == EntityKind::Line).filter_map(move |e| {
        let sketch_store::EntityShape::Line { start, end } = &e.shape else {
            return None;
        };
        let (sx, sy) = sketch.get_entity(*start)?.as_point()?;
        let (ex, ey) = sketch.get_entity(*end)?.as_point()?;
        Some((e.id, Vec2::new(sx, sy), Vec2::new(ex, ey)))
    })
}

fn infer_perpendicular(start: Vec2, end: Vec2, line: EntityId, sketch: &Sketch, context: &DrawingContext) -> Option<InferredConstraint> {
    let reference = context.previous_entity?;
    let d = (end - start).normalized();
    other_lines(sketch, line)
        .find(|(id, a, b)| *id == reference && (a.distance(*b) > MIN_GEOMETRY_SIZE))
        .and_then(|(id, a, b)| {
            let other_dir = (b - a).normalized();
            let dot = d.dot(other_dir).abs();
            (dot <= ANGLE_TOLERANCE.sin()).then(|| InferredConstraint {
                kind: ConstraintKind::Perpendicular { line_a: line, line_b: id },
                confidence: 1.0 - dot / ANGLE_TOLERANCE.sin() * 0.2,
            })
        })
}

fn infer_parallel(start: Vec2, end: Vec2, line: EntityId, sketch: &Sketch, context: &DrawingContext) -> Option<InferredConstraint> {
    let reference = context.previous_entity?;
    let d = (end - start).normalized();
    other_lines(sketch, line)
        .find(|(id, a, b)| *id == reference && (a.distance(*b) > MIN_GEOMETRY_SIZE))
        .and_then(|(id, a, b)| {
            let other_dir = (b - a).normalized();
            let cross = d.cross(other_dir).abs();
            (cross <= ANGLE_TOLERANCE.sin()).then(|| InferredConstraint {
                kind: ConstraintKind::Parallel { line_a: line, line_b: id },
                confidence: 1.0 - cross / ANGLE_TOLERANCE.sin() * 0.2,
            })
        })
}

/// Finds a freestanding existing point within [`COINCIDENT_TOLERANCE`] of
/// `pos` that isn't the owning entity's own endpoint, and infers a
/// `Coincident` constraint against it.
fn infer_coincident(pos: Vec2, owner: EntityId, sketch: &Sketch) -> Option<InferredConstraint> {
    let owner_points: Vec<EntityId> = sketch.get_entity(owner)?.references();
    let owner_point = owner_points
        .iter()
        .copied()
        .filter_map(|id| sketch.get_entity(id).and_then(|e| e.as_point()).map(|(x, y)| (id, Vec2::new(x, y))))
        .min_by(|(_, a), (_, b)| a.distance(pos).partial_cmp(&b.distance(pos)).unwrap())?
        .0;
    sketch
        .entities()
        .filter(|e| e.kind() == EntityKind::Point)
        .filter(|e| !owner_points.contains(&e.id))
        .find_map(|e| {
            let (x, y) = e.as_point()?;
            let d = Vec2::new(x, y).distance(pos);
            (d <= COINCIDENT_TOLERANCE && d > 1e-9).then(|| InferredConstraint {
                kind: ConstraintKind::Coincident { point_a: owner_point, point_b: e.id },
                confidence: 1.0,
            })
        })
}

fn infer_concentric(center: Vec2, owner: EntityId, sketch: &Sketch) -> Option<InferredConstraint> {
    sketch
        .entities()
        .filter(|e| e.id != owner && matches!(e.kind(), EntityKind::Circle | EntityKind::Arc))
        .find_map(|e| {
            let other_center_id = e.references().first().copied()?;
            let (x, y) = sketch.get_entity(other_center_id)?.as_point()?;
            let d = Vec2::new(x, y).distance(center);
            (d <= COINCIDENT_TOLERANCE && d > 1e-9).then(|| InferredConstraint {
                kind: ConstraintKind::Concentric { entity_a: owner, entity_b: e.id },
                confidence: 0.9,
            })
        })
}

fn infer_equal_radius(radius: f64, owner: EntityId, sketch: &Sketch) -> Option<InferredConstraint> {
    sketch
        .entities()
        .filter(|e| e.id != owner && matches!(e.kind(), EntityKind::Circle | EntityKind::Arc))
        .find_map(|e| {
            let other_radius = match &e.shape {
                sketch_store::EntityShape::Circle { radius, .. } => *radius,
                sketch_store::EntityShape::Arc { radius, .. } => *radius,
                _ => return None,
            };
            let rel = (other_radius - radius).abs() / radius.max(1e-9);
            (rel <= 0.02).then(|| InferredConstraint {
                kind: ConstraintKind::Equal { entity_a: owner, entity_b: e.id },
                confidence: 0.7,
            })
        })
}

fn infer_tangent(arc_start: Vec2, arc_id: EntityId, sketch: &Sketch) -> Option<InferredConstraint> {
    other_lines(sketch, arc_id).find_map(|(id, a, b)| {
        let len = a.distance(b);
        if len < MIN_GEOMETRY_SIZE {
            return None;
        }
        let t = ((arc_start - a).dot(b - a) / (len * len)).clamp(0.0, 1.0);
        let closest = a.lerp(b, t);
        (closest.distance(arc_start) <= COINCIDENT_TOLERANCE).then(|| InferredConstraint {
            kind: ConstraintKind::Tangent { entity_a: arc_id, entity_b: id },
            confidence: 0.8,
        })
    })
}
