//! The `Sketch` aggregate: entity/constraint storage, the mutation API,
//! and DOF accounting.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use waffle_types::{normalize_sweep, BoundingBox, ConstraintId, EntityId, Plane, Vec2};

use crate::constraint::{Constraint, ConstraintKind, CurvePosition};
use crate::entity::{Entity, EntityKind, EntityShape};

/// Absolute distance tolerance below which a requested split point is
/// rejected as "too close to an existing endpoint", regardless of line
/// length.
const SPLIT_LINE_DIST_TOL: f64 = 0.1;

/// Absolute angular tolerance (radians) below which a requested arc split
/// angle is rejected as "too close to an existing endpoint".
const SPLIT_ARC_ANGLE_TOL: f64 = 0.01;

/// Distance tolerance for auto-detecting `Start`/`End` on a `PointOnCurve`
/// constraint against an arc's endpoints.
const POINT_ON_CURVE_ENDPOINT_TOL: f64 = 1e-6;

const NEAREST_CURVE_SAMPLES: usize = 72;

/// Records that a sketch's plane is attached to a solid's face, and the
/// version stamp of the last boundary projection (supplemented feature; the
/// projector itself is an external collaborator).
#[derive(Debug, Clone)]
pub struct HostFaceAttachment {
    pub face_ref: waffle_types::GeomRef,
    pub projected_boundary_version: u64,
}

/// Result of [`Sketch::validate`]: a non-fatal report of integrity issues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A single parametric sketch: its entity/constraint graph plus the plane it
/// is embedded in.
#[derive(Debug, Clone)]
pub struct Sketch {
    pub id: Uuid,
    pub plane: Plane,
    pub host_face: Option<HostFaceAttachment>,

    pub(crate) entities: Vec<Entity>,
    pub(crate) entity_index: HashMap<EntityId, usize>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) constraint_index: HashMap<ConstraintId, usize>,

    pub(crate) next_entity_id: EntityId,
    pub(crate) next_constraint_id: ConstraintId,

    pub(crate) dof_cache: Option<i64>,
    pub(crate) dirty: bool,

    conflicting_constraints: Vec<ConstraintId>,
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}

impl Sketch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            plane: Plane::xy(),
            host_face: None,
            entities: Vec::new(),
            entity_index: HashMap::new(),
            constraints: Vec::new(),
            constraint_index: HashMap::new(),
            next_entity_id: 1,
            next_constraint_id: 1,
            dof_cache: None,
            dirty: true,
            conflicting_constraints: Vec::new(),
        }
    }

    pub fn on_plane(plane: Plane) -> Self {
        Self {
            plane,
            ..Self::new()
        }
    }

    // -- dirty tracking -------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.dof_cache = None;
    }

    // -- lookup -----------------------------------------------------------

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entity_index.get(&id).map(|&i| &self.entities[i])
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let idx = *self.entity_index.get(&id)?;
        Some(&mut self.entities[idx])
    }

    pub fn get_constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraint_index.get(&id).map(|&i| &self.constraints[i])
    }

    pub fn get_entities_by_type(&self, kind: EntityKind) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.kind() == kind).collect()
    }

    pub fn get_constraints_for_entity(&self, id: EntityId) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.referenced_entities().contains(&id))
            .collect()
    }

    pub fn is_entity_reference_locked(&self, id: EntityId) -> bool {
        self.get_entity(id).map(|e| e.reference_locked).unwrap_or(false)
    }

    /// Used by the (external) face-boundary projector to pin host-attached
    /// geometry against further editing.
    pub fn set_entity_reference_locked(&mut self, id: EntityId, locked: bool) -> bool {
        match self.get_entity_mut(id) {
            Some(e) => {
                e.reference_locked = locked;
                true
            }
            None => false,
        }
    }

    fn rebuild_entity_index(&mut self) {
        self.entity_index = self.entities.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
    }

    fn rebuild_constraint_index(&mut self) {
        self.constraint_index = self
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
    }

    fn point_xy(&self, id: EntityId) -> Option<Vec2> {
        self.get_entity(id)?.as_point().map(|(x, y)| Vec2::new(x, y))
    }

    fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.get_entity(id).map(|e| e.kind())
    }

    // -- entity creation ----------------------------------------------------

    pub fn add_point(&mut self, x: f64, y: f64, construction: bool) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            construction,
            reference_locked: false,
            shape: EntityShape::Point {
                x,
                y,
                connected: std::collections::BTreeSet::new(),
            },
        });
        self.mark_dirty();
        id
    }

    fn link_point(&mut self, point_id: EntityId, dependent_id: EntityId) {
        if let Some(Entity {
            shape: EntityShape::Point { connected, .. },
            ..
        }) = self.get_entity_mut(point_id)
        {
            connected.insert(dependent_id);
        }
    }

    pub fn add_line(&mut self, start: EntityId, end: EntityId, construction: bool) -> Option<EntityId> {
        if self.kind_of(start)? != EntityKind::Point || self.kind_of(end)? != EntityKind::Point {
            return None;
        }
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            construction,
            reference_locked: false,
            shape: EntityShape::Line { start, end },
        });
        self.link_point(start, id);
        self.link_point(end, id);
        self.mark_dirty();
        Some(id)
    }

    pub fn add_arc(
        &mut self,
        center: EntityId,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        construction: bool,
    ) -> Option<EntityId> {
        if self.kind_of(center)? != EntityKind::Point {
            return None;
        }
        let radius = radius.max(0.0);
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            construction,
            reference_locked: false,
            shape: EntityShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            },
        });
        self.link_point(center, id);
        self.mark_dirty();
        Some(id)
    }

    pub fn add_circle(&mut self, center: EntityId, radius: f64, construction: bool) -> Option<EntityId> {
        if self.kind_of(center)? != EntityKind::Point {
            return None;
        }
        let radius = radius.max(0.0);
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            construction,
            reference_locked: false,
            shape: EntityShape::Circle { center, radius },
        });
        self.link_point(center, id);
        self.mark_dirty();
        Some(id)
    }

    pub fn add_ellipse(
        &mut self,
        center: EntityId,
        major_radius: f64,
        minor_radius: f64,
        rotation: f64,
        construction: bool,
    ) -> Option<EntityId> {
        if self.kind_of(center)? != EntityKind::Point {
            return None;
        }
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entity_index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            construction,
            reference_locked: false,
            shape: EntityShape::Ellipse {
                center,
                major_radius: major_radius.max(0.0),
                minor_radius: minor_radius.max(0.0),
                rotation,
            },
        });
        if let Some(e) = self.entities.last_mut() {
            e.enforce_ellipse_ordering();
        }
        self.link_point(center, id);
        self.mark_dirty();
        Some(id)
    }

    // -- entity removal -------------------------------------------------

    /// Removes an entity. Points cascade: every dependent entity is removed
    /// first, atomically (the whole call fails with no state change if any
    /// dependent is reference-locked). Non-point removal detaches its back-
    /// pointers and orphan-cleans any point left with no remaining
    /// dependents, unless that point is itself reference-locked.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.get_entity(id) else {
            return false;
        };
        if entity.reference_locked {
            return false;
        }

        if let EntityShape::Point { connected, .. } = &entity.shape {
            let dependents: Vec<EntityId> = connected.iter().copied().collect();
            for dep_id in &dependents {
                if self.is_entity_reference_locked(*dep_id) {
                    return false;
                }
            }
            for dep_id in dependents {
                self.remove_entity_internal(dep_id);
            }
        }
        self.remove_entity_internal(id);
        self.mark_dirty();
        true
    }

    fn remove_entity_internal(&mut self, id: EntityId) {
        let Some(entity) = self.get_entity(id).cloned() else {
            return;
        };

        self.constraints.retain(|c| !c.referenced_entities().contains(&id));
        self.rebuild_constraint_index();

        for referenced_id in entity.references() {
            let mut now_empty = false;
            if let Some(Entity {
                shape: EntityShape::Point { connected, .. },
                ..
            }) = self.get_entity_mut(referenced_id)
            {
                connected.remove(&id);
                now_empty = connected.is_empty();
            }
            if now_empty && !self.is_entity_reference_locked(referenced_id) {
                self.remove_entity_internal(referenced_id);
            }
        }

        if let Some(pos) = self.entity_index.get(&id).copied() {
            self.entities.remove(pos);
            self.rebuild_entity_index();
        }
    }

    // -- splitting --------------------------------------------------------

    /// Splits a line at `point`, which is projected onto the line to find the
    /// split parameter. Fails (no state change) if the line is missing,
    /// reference-locked, or the projected point falls within
    /// [`SPLIT_LINE_DIST_TOL`] of either endpoint.
    pub fn split_line_at(&mut self, id: EntityId, point: Vec2) -> Option<(EntityId, EntityId)> {
        let entity = self.get_entity(id)?.clone();
        if entity.reference_locked {
            return None;
        }
        let (start_id, end_id) = match entity.shape {
            EntityShape::Line { start, end } => (start, end),
            _ => return None,
        };
        let start = self.point_xy(start_id)?;
        let end = self.point_xy(end_id)?;
        let dir = end - start;
        let len_sq = dir.length_squared();
        if len_sq < 1e-20 {
            return None;
        }
        let t = (point - start).dot(dir) / len_sq;
        let len = len_sq.sqrt();
        if t * len <= SPLIT_LINE_DIST_TOL || (1.0 - t) * len <= SPLIT_LINE_DIST_TOL {
            return None;
        }

        let split_pos = start.lerp(end, t);
        let mid_id = self.add_point(split_pos.x, split_pos.y, entity.construction);
        let left_id = self.add_line(start_id, mid_id, entity.construction)?;
        let right_id = self.add_line(mid_id, end_id, entity.construction)?;
        self.remove_entity_internal(id);
        self.mark_dirty();
        Some((left_id, right_id))
    }

    /// Splits an arc at `angle` (radians). Inserts an unreferenced interior
    /// point at the split location for downstream snapping, but (unlike
    /// lines) the two replacement arcs reference only the shared center.
    pub fn split_arc_at(&mut self, id: EntityId, angle: f64) -> Option<(EntityId, EntityId)> {
        let entity = self.get_entity(id)?.clone();
        if entity.reference_locked {
            return None;
        }
        let (center, radius, start_angle, end_angle) = match entity.shape {
            EntityShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => (center, radius, start_angle, end_angle),
            _ => return None,
        };
        let sweep = normalize_sweep(start_angle, end_angle);
        let rel = normalize_sweep(start_angle, angle);
        if rel <= SPLIT_ARC_ANGLE_TOL || rel >= sweep - SPLIT_ARC_ANGLE_TOL {
            return None;
        }

        let center_pos = self.point_xy(center)?;
        let split_pos = center_pos + Vec2::new(angle.cos(), angle.sin()) * radius;
        self.add_point(split_pos.x, split_pos.y, entity.construction);

        let left_id = self.add_arc(center, radius, start_angle, angle, entity.construction)?;
        let right_id = self.add_arc(center, radius, angle, end_angle, entity.construction)?;
        self.remove_entity_internal(id);
        self.mark_dirty();
        Some((left_id, right_id))
    }

    // -- constraints --------------------------------------------------------

    fn entities_exist(&self, ids: &[EntityId]) -> bool {
        ids.iter().all(|id| self.entity_index.contains_key(id))
    }

    /// Adds a constraint. Fails if any referenced entity is missing, or is
    /// reference-locked and the kind is anything but `Fixed` (Invariant 2).
    pub fn add_constraint(&mut self, kind: ConstraintKind) -> Option<ConstraintId> {
        let refs = kind.referenced_entities();
        if !self.entities_exist(&refs) {
            return None;
        }
        if !kind.allows_locked_targets() && refs.iter().any(|id| self.is_entity_reference_locked(*id)) {
            return None;
        }

        let id = self.next_constraint_id;
        self.next_constraint_id += 1;
        self.constraint_index.insert(id, self.constraints.len());
        self.constraints.push(Constraint { id, kind });
        self.mark_dirty();
        tracing::debug!(constraint_id = id, "added constraint");
        Some(id)
    }

    /// Fails if any entity the constraint references is reference-locked,
    /// regardless of kind: removal would silently change the effective
    /// constraint state of locked geometry.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        let Some(constraint) = self.get_constraint(id) else {
            return false;
        };
        if constraint
            .referenced_entities()
            .iter()
            .any(|e| self.is_entity_reference_locked(*e))
        {
            return false;
        }
        if let Some(pos) = self.constraint_index.get(&id).copied() {
            self.constraints.remove(pos);
            self.rebuild_constraint_index();
            self.mark_dirty();
            return true;
        }
        false
    }

    fn check_kinds(&self, checks: &[(EntityId, EntityKind)]) -> bool {
        checks.iter().all(|(id, kind)| self.kind_of(*id) == Some(*kind))
    }

    pub fn add_coincident(&mut self, point_a: EntityId, point_b: EntityId) -> Option<ConstraintId> {
        if !self.check_kinds(&[(point_a, EntityKind::Point), (point_b, EntityKind::Point)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Coincident { point_a, point_b })
    }

    pub fn add_horizontal(&mut self, line: EntityId) -> Option<ConstraintId> {
        if !self.check_kinds(&[(line, EntityKind::Line)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Horizontal { line })
    }

    pub fn add_vertical(&mut self, line: EntityId) -> Option<ConstraintId> {
        if !self.check_kinds(&[(line, EntityKind::Line)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Vertical { line })
    }

    pub fn add_parallel(&mut self, line_a: EntityId, line_b: EntityId) -> Option<ConstraintId> {
        if !self.check_kinds(&[(line_a, EntityKind::Line), (line_b, EntityKind::Line)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Parallel { line_a, line_b })
    }

    pub fn add_perpendicular(&mut self, line_a: EntityId, line_b: EntityId) -> Option<ConstraintId> {
        if !self.check_kinds(&[(line_a, EntityKind::Line), (line_b, EntityKind::Line)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Perpendicular { line_a, line_b })
    }

    pub fn add_distance(&mut self, point_a: EntityId, point_b: EntityId, value: f64) -> Option<ConstraintId> {
        if !self.check_kinds(&[(point_a, EntityKind::Point), (point_b, EntityKind::Point)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Distance { point_a, point_b, value })
    }

    pub fn add_radius(&mut self, curve: EntityId, value: f64) -> Option<ConstraintId> {
        match self.kind_of(curve) {
            Some(EntityKind::Arc) | Some(EntityKind::Circle) => {}
            _ => return None,
        }
        self.add_constraint(ConstraintKind::Radius { curve, value })
    }

    pub fn add_diameter(&mut self, curve: EntityId, value: f64) -> Option<ConstraintId> {
        match self.kind_of(curve) {
            Some(EntityKind::Arc) | Some(EntityKind::Circle) => {}
            _ => return None,
        }
        self.add_constraint(ConstraintKind::Diameter { curve, value })
    }

    /// `value_degrees` is converted to radians before being stored.
    pub fn add_angle(&mut self, line_a: EntityId, line_b: EntityId, value_degrees: f64) -> Option<ConstraintId> {
        if !self.check_kinds(&[(line_a, EntityKind::Line), (line_b, EntityKind::Line)]) {
            return None;
        }
        self.add_constraint(ConstraintKind::Angle {
            line_a,
            line_b,
            value: value_degrees.to_radians(),
        })
    }

    /// Captures `point`'s current position as the fixed target.
    pub fn add_fixed(&mut self, point: EntityId) -> Option<ConstraintId> {
        let (x, y) = self.get_entity(point)?.as_point()?;
        self.add_constraint(ConstraintKind::Fixed { point, x, y })
    }

    /// `position` is auto-detected to `Start`/`End` when `Arbitrary` is given
    /// and `point` lies within [`POINT_ON_CURVE_ENDPOINT_TOL`] of an arc
    /// endpoint.
    pub fn add_point_on_curve(
        &mut self,
        point: EntityId,
        curve: EntityId,
        position: CurvePosition,
    ) -> Option<ConstraintId> {
        if self.kind_of(point)? != EntityKind::Point {
            return None;
        }
        let resolved = if matches!(position, CurvePosition::Arbitrary) {
            self.detect_arc_position(point, curve).unwrap_or(position)
        } else {
            position
        };
        self.add_constraint(ConstraintKind::PointOnCurve {
            point,
            curve,
            position: resolved,
        })
    }

    fn detect_arc_position(&self, point: EntityId, curve: EntityId) -> Option<CurvePosition> {
        let entity = self.get_entity(curve)?;
        let EntityShape::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } = entity.shape
        else {
            return None;
        };
        let p = self.point_xy(point)?;
        let c = self.point_xy(center)?;
        let start_pt = c + Vec2::new(start_angle.cos(), start_angle.sin()) * radius;
        let end_pt = c + Vec2::new(end_angle.cos(), end_angle.sin()) * radius;
        if p.distance(start_pt) < POINT_ON_CURVE_ENDPOINT_TOL {
            Some(CurvePosition::Start)
        } else if p.distance(end_pt) < POINT_ON_CURVE_ENDPOINT_TOL {
            Some(CurvePosition::End)
        } else {
            None
        }
    }

    // -- translation --------------------------------------------------------

    /// Translates every non-reference-locked point by `(dx, dy)`, and shifts
    /// the captured target of every `Fixed` constraint on a moved point to
    /// match.
    pub fn translate_sketch(&mut self, dx: f64, dy: f64) {
        let ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.kind() == EntityKind::Point && !e.reference_locked)
            .map(|e| e.id)
            .collect();
        self.translate_points(&ids, dx, dy);
    }

    /// Translates the given points (skipping any that are reference-locked)
    /// by `(dx, dy)`. Used by tool code to move a selected region without the
    /// caller needing to know about face/loop extraction.
    pub fn translate_points(&mut self, point_ids: &[EntityId], dx: f64, dy: f64) {
        let moved: HashSet<EntityId> = point_ids
            .iter()
            .copied()
            .filter(|id| !self.is_entity_reference_locked(*id))
            .collect();
        for &id in &moved {
            if let Some(Entity {
                shape: EntityShape::Point { x, y, .. },
                ..
            }) = self.get_entity_mut(id)
            {
                *x += dx;
                *y += dy;
            }
        }
        for constraint in &mut self.constraints {
            if let ConstraintKind::Fixed { point, x, y } = &mut constraint.kind {
                if moved.contains(point) {
                    *x += dx;
                    *y += dy;
                }
            }
        }
        if !moved.is_empty() {
            self.mark_dirty();
        }
    }

    // -- queries --------------------------------------------------------

    fn entity_distance(&self, entity: &Entity, pos: Vec2) -> Option<f64> {
        match &entity.shape {
            EntityShape::Point { x, y, .. } => Some(pos.distance(Vec2::new(*x, *y))),
            EntityShape::Line { start, end } => {
                let a = self.point_xy(*start)?;
                let b = self.point_xy(*end)?;
                Some(point_segment_distance(pos, a, b))
            }
            EntityShape::Circle { center, radius } => {
                let c = self.point_xy(*center)?;
                Some((pos.distance(c) - radius).abs())
            }
            EntityShape::Arc { center, radius, .. } => {
                let c = self.point_xy(*center)?;
                Some((pos.distance(c) - radius).abs())
            }
            EntityShape::Ellipse {
                center,
                major_radius,
                minor_radius,
                rotation,
            } => {
                let c = self.point_xy(*center)?;
                let samples = waffle_types::sample_ellipse(c, *major_radius, *minor_radius, *rotation, NEAREST_CURVE_SAMPLES);
                samples.into_iter().map(|s| pos.distance(s)).fold(None, |acc, d| {
                    Some(acc.map_or(d, |a: f64| a.min(d)))
                })
            }
        }
    }

    /// Finds the closest entity to `pos` within `tolerance`, optionally
    /// restricted to `filter` kinds. Uses a per-type distance metric
    /// (endpoint distance for points, point-segment distance for lines,
    /// `|distance(center) - radius|` for circles/arcs, sampled for ellipses).
    pub fn find_nearest(&self, pos: Vec2, tolerance: f64, filter: Option<&[EntityKind]>) -> Option<EntityId> {
        let mut best: Option<(EntityId, f64)> = None;
        for entity in &self.entities {
            if let Some(kinds) = filter {
                if !kinds.contains(&entity.kind()) {
                    continue;
                }
            }
            let Some(d) = self.entity_distance(entity, pos) else {
                continue;
            };
            if d <= tolerance && best.as_ref().map(|(_, bd)| d < *bd).unwrap_or(true) {
                best = Some((entity.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    fn entity_bbox(&self, entity: &Entity) -> Option<BoundingBox> {
        match &entity.shape {
            EntityShape::Point { x, y, .. } => Some(BoundingBox {
                min: Vec2::new(*x, *y),
                max: Vec2::new(*x, *y),
            }),
            EntityShape::Line { start, end } => {
                BoundingBox::from_points([self.point_xy(*start)?, self.point_xy(*end)?])
            }
            EntityShape::Circle { center, radius } => {
                let c = self.point_xy(*center)?;
                Some(BoundingBox {
                    min: Vec2::new(c.x - radius, c.y - radius),
                    max: Vec2::new(c.x + radius, c.y + radius),
                })
            }
            EntityShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let c = self.point_xy(*center)?;
                BoundingBox::from_points(waffle_types::sample_arc(c, *radius, *start_angle, *end_angle, 16))
            }
            EntityShape::Ellipse {
                center,
                major_radius,
                minor_radius,
                rotation,
            } => {
                let c = self.point_xy(*center)?;
                BoundingBox::from_points(waffle_types::sample_ellipse(c, *major_radius, *minor_radius, *rotation, 32))
            }
        }
    }

    /// Entities whose bounding box intersects the query rectangle.
    pub fn find_in_rect(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        let query = BoundingBox { min, max };
        self.entities
            .iter()
            .filter(|e| self.entity_bbox(e).map(|bb| bb.intersects(&query)).unwrap_or(false))
            .map(|e| e.id)
            .collect()
    }

    // -- DOF accounting --------------------------------------------------------

    fn raw_dof(&self) -> i64 {
        let entity_dof: i64 = self.entities.iter().map(|e| e.dof() as i64).sum();
        let removed: i64 = self.constraints.iter().map(|c| c.dof_removed() as i64).sum();
        entity_dof - removed
    }

    pub fn get_degrees_of_freedom(&mut self) -> i64 {
        if let Some(cached) = self.dof_cache {
            return cached;
        }
        let dof = self.raw_dof().max(0);
        self.dof_cache = Some(dof);
        dof
    }

    pub fn is_over_constrained(&self) -> bool {
        self.raw_dof() < 0
    }

    /// Constraints the last solve attempt identified as contributing to
    /// over-constraint. Populated by [`Sketch::set_conflicting_constraints`]
    /// when the solver raises `SolverError::OverConstrained`; absent a solve
    /// it is empty even if [`Sketch::is_over_constrained`] is true.
    pub fn get_conflicting_constraints(&self) -> &[ConstraintId] {
        &self.conflicting_constraints
    }

    /// Records the constraint set a solve attempt found responsible for rank
    /// deficiency. Called by the solver, not by tool code.
    pub fn set_conflicting_constraints(&mut self, ids: Vec<ConstraintId>) {
        self.conflicting_constraints = ids;
    }

    pub fn validate(&self) -> ValidationResult {
        let mut issues = Vec::new();
        for constraint in &self.constraints {
            for id in constraint.referenced_entities() {
                if !self.entity_index.contains_key(&id) {
                    issues.push(format!(
                        "constraint {} references missing entity {}",
                        constraint.id, id
                    ));
                }
            }
        }
        for entity in &self.entities {
            for id in entity.references() {
                if !self.entity_index.contains_key(&id) {
                    issues.push(format!("entity {} references missing entity {}", entity.id, id));
                    continue;
                }
                if self.kind_of(id) != Some(EntityKind::Point) {
                    issues.push(format!("entity {} references non-point entity {}", entity.id, id));
                }
            }
            if let EntityShape::Ellipse {
                major_radius,
                minor_radius,
                ..
            } = entity.shape
            {
                if major_radius < minor_radius {
                    issues.push(format!("ellipse {} has major_radius < minor_radius", entity.id));
                }
            }
        }
        ValidationResult { issues }
    }

    /// Whether `point` has at least one `Fixed` constraint pinning it.
    pub fn has_fixed_constraint(&self, point: EntityId) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(&c.kind, ConstraintKind::Fixed { point: p, .. } if *p == point))
    }

    /// Remaining unconstrained directions of motion for a point: a coarse,
    /// non-solver diagnostic (empty once the point carries a `Fixed`
    /// constraint, the two sketch axes otherwise). A full null-space
    /// computation belongs to the solver, which sees the assembled Jacobian.
    pub fn free_directions(&self, point: EntityId) -> Vec<Vec2> {
        if self.kind_of(point) != Some(EntityKind::Point) {
            return Vec::new();
        }
        if self.has_fixed_constraint(point) {
            return Vec::new();
        }
        vec![Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]
    }

    pub fn set_host_face_attachment(&mut self, attachment: Option<HostFaceAttachment>) {
        self.host_face = attachment;
        self.mark_dirty();
    }

    pub fn set_projected_host_boundaries_version(&mut self, version: u64) {
        if let Some(host_face) = &mut self.host_face {
            host_face.projected_boundary_version = version;
        }
    }
}

fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-20 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(sketch: &mut Sketch) -> [EntityId; 4] {
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(1.0, 0.0, false);
        let p2 = sketch.add_point(1.0, 1.0, false);
        let p3 = sketch.add_point(0.0, 1.0, false);
        sketch.add_line(p0, p1, false).unwrap();
        sketch.add_line(p1, p2, false).unwrap();
        sketch.add_line(p2, p3, false).unwrap();
        sketch.add_line(p3, p0, false).unwrap();
        [p0, p1, p2, p3]
    }

    #[test]
    fn add_line_requires_points() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(0.0, 0.0, false);
        assert!(sketch.add_line(p, 999, false).is_none());
    }

    #[test]
    fn remove_point_cascades_to_lines() {
        let mut sketch = Sketch::new();
        let [p0, p1, ..] = square(&mut sketch);
        assert!(sketch.remove_entity(p0));
        assert!(sketch.get_entity(p0).is_none());
        // both lines touching p0 are gone
        assert_eq!(sketch.get_entities_by_type(EntityKind::Line).len(), 2);
        assert!(sketch.get_entity(p1).is_some());
    }

    #[test]
    fn reference_locked_entity_cannot_be_removed() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(0.0, 0.0, false);
        sketch.set_entity_reference_locked(p, true);
        assert!(!sketch.remove_entity(p));
    }

    #[test]
    fn reference_locked_dependent_blocks_point_removal() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(1.0, 0.0, false);
        let line = sketch.add_line(p0, p1, false).unwrap();
        sketch.set_entity_reference_locked(line, true);
        assert!(!sketch.remove_entity(p0));
        assert!(sketch.get_entity(p0).is_some());
        assert!(sketch.get_entity(line).is_some());
    }

    #[test]
    fn split_line_rejects_near_endpoint() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        let line = sketch.add_line(p0, p1, false).unwrap();
        assert!(sketch.split_line_at(line, Vec2::new(0.001, 0.0)).is_none());
        assert!(sketch.split_line_at(line, Vec2::new(5.0, 0.0)).is_some());
    }

    #[test]
    fn split_line_preserves_endpoints() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        let line = sketch.add_line(p0, p1, false).unwrap();
        let (left, right) = sketch.split_line_at(line, Vec2::new(4.0, 0.0)).unwrap();
        assert!(sketch.get_entity(line).is_none());
        let left_shape = sketch.get_entity(left).unwrap();
        if let EntityShape::Line { start, .. } = left_shape.shape {
            assert_eq!(start, p0);
        } else {
            panic!("expected line");
        }
        let right_shape = sketch.get_entity(right).unwrap();
        if let EntityShape::Line { end, .. } = right_shape.shape {
            assert_eq!(end, p1);
        } else {
            panic!("expected line");
        }
    }

    #[test]
    fn dof_accounting_for_unconstrained_square() {
        let mut sketch = Sketch::new();
        square(&mut sketch);
        // 4 points * 2 dof, 4 lines * 0 dof, no constraints
        assert_eq!(sketch.get_degrees_of_freedom(), 8);
    }

    #[test]
    fn fixed_constraint_removes_dof_and_blocks_translation() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(2.0, 3.0, false);
        sketch.add_fixed(p).unwrap();
        assert_eq!(sketch.get_degrees_of_freedom(), 0);
    }

    #[test]
    fn add_constraint_on_locked_entity_rejected_unless_fixed() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(1.0, 0.0, false);
        sketch.set_entity_reference_locked(p0, true);
        assert!(sketch.add_coincident(p0, p1).is_none());
        assert!(sketch.add_fixed(p0).is_some());
    }

    #[test]
    fn translate_sketch_moves_fixed_target_too() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(1.0, 1.0, false);
        let cid = sketch.add_fixed(p).unwrap();
        sketch.translate_sketch(1.0, 0.0);
        let (x, y) = sketch.get_entity(p).unwrap().as_point().unwrap();
        assert_eq!((x, y), (2.0, 1.0));
        if let ConstraintKind::Fixed { x, y, .. } = sketch.get_constraint(cid).unwrap().kind {
            assert_eq!((x, y), (2.0, 1.0));
        } else {
            panic!("expected fixed constraint");
        }
    }

    #[test]
    fn find_nearest_respects_tolerance_and_filter() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(0.0, 0.0, false);
        assert_eq!(
            sketch.find_nearest(Vec2::new(0.05, 0.0), 0.1, Some(&[EntityKind::Point])),
            Some(p)
        );
        assert_eq!(sketch.find_nearest(Vec2::new(5.0, 0.0), 0.1, None), None);
    }

    #[test]
    fn ellipse_ordering_enforced_at_creation() {
        let mut sketch = Sketch::new();
        let c = sketch.add_point(0.0, 0.0, false);
        let e = sketch.add_ellipse(c, 1.0, 2.0, 0.0, false).unwrap();
        if let EntityShape::Ellipse {
            major_radius,
            minor_radius,
            ..
        } = sketch.get_entity(e).unwrap().shape
        {
            assert!(major_radius >= minor_radius);
        } else {
            panic!("expected ellipse");
        }
    }
}
