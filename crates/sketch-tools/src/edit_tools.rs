//! Trim and Mirror tools, grounded on `TrimTool.cpp`/`.h` and
//! `MirrorTool.cpp`/`.h`.

use sketch_store::{EntityId, EntityKind, EntityShape, Sketch};
use snap_resolver::SnapResult;
use waffle_types::Vec2;

use crate::auto_constrain::InferredConstraint;
use crate::tool::{MouseButton, PreviewGeometry, SketchTool, ToolCommit, ToolState};

/// Any click deletes the hovered non-point entity. Stateless beyond whether
/// it's active; `state()` is always `Idle` or `FirstClick` purely to satisfy
/// the uniform `is_active` surface (trim never needs a multi-click gesture).
#[derive(Default)]
pub struct TrimTool {
    active: bool,
    hovered: Option<EntityId>,
}

impl TrimTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn set_hovered(&mut self, id: Option<EntityId>) {
        self.hovered = id;
    }
}

impl SketchTool for TrimTool {
    fn name(&self) -> &'static str {
        "Trim"
    }

    fn state(&self) -> ToolState {
        if self.active {
            ToolState::FirstClick
        } else {
            ToolState::Idle
        }
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, _button: MouseButton, _snapped_pos: Vec2, _snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        let Some(id) = self.hovered else {
            return ToolCommit::default();
        };
        if sketch.get_entity(id).map(|e| e.kind()) == Some(EntityKind::Point) {
            return ToolCommit::default();
        }
        if sketch.remove_entity(id) {
            ToolCommit {
                created_entities: Vec::new(),
                deleted_entities: vec![id],
            }
        } else {
            ToolCommit::default()
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, _snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        PreviewGeometry::None
    }

    fn cancel(&mut self) {
        self.active = false;
        self.hovered = None;
    }
}

/// First click selects a line as the mirror axis; subsequent clicks mirror
/// the hovered entity across that axis, cloning its endpoints and
/// re-expressing arc angles by reflection.
#[derive(Default)]
pub struct MirrorTool {
    axis: Option<EntityId>,
    hovered: Option<EntityId>,
}

impl MirrorTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hovered(&mut self, id: Option<EntityId>) {
        self.hovered = id;
    }
}

fn axis_line(sketch: &Sketch, axis: EntityId) -> Option<(Vec2, Vec2)> {
    let entity = sketch.get_entity(axis)?;
    let EntityShape::Line { start, end } = &entity.shape else {
        return None;
    };
    let (sx, sy) = sketch.get_entity(*start)?.as_point()?;
    let (ex, ey) = sketch.get_entity(*end)?.as_point()?;
    Some((Vec2::new(sx, sy), Vec2::new(ex, ey)))
}

/// Reflects `p` across the infinite line through `a`-`b`.
fn reflect_point(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let dir = (b - a).normalized();
    let rel = p - a;
    let proj = dir * rel.dot(dir);
    let perp = rel - proj;
    a + proj - perp
}

impl SketchTool for MirrorTool {
    fn name(&self) -> &'static str {
        "Mirror"
    }

    fn state(&self) -> ToolState {
        if self.axis.is_some() {
            ToolState::FirstClick
        } else {
            ToolState::Idle
        }
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, _button: MouseButton, _snapped_pos: Vec2, _snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        if self.axis.is_none() {
            let Some(candidate) = self.hovered else {
                return ToolCommit::default();
            };
            if sketch.get_entity(candidate).map(|e| e.kind()) != Some(EntityKind::Line) {
                return ToolCommit::default();
            }
            self.axis = Some(candidate);
            return ToolCommit::default();
        }

        let Some(axis) = self.axis else {
            return ToolCommit::default();
        };
        let Some(target) = self.hovered else {
            return ToolCommit::default();
        };
        if target == axis {
            return ToolCommit::default();
        }
        let Some((a, b)) = axis_line(sketch, axis) else {
            return ToolCommit::default();
        };
        let Some(entity) = sketch.get_entity(target).cloned() else {
            return ToolCommit::default();
        };

        let mut created = Vec::new();
        match entity.shape {
            EntityShape::Line { start, end } => {
                let (Some((sx, sy)), Some((ex, ey))) = (
                    sketch.get_entity(start).and_then(|e| e.as_point()),
                    sketch.get_entity(end).and_then(|e| e.as_point()),
                ) else {
                    return ToolCommit::default();
                };
                let ns = reflect_point(Vec2::new(sx, sy), a, b);
                let ne = reflect_point(Vec2::new(ex, ey), a, b);
                let ns_id = sketch.add_point(ns.x, ns.y, entity.construction);
                let ne_id = sketch.add_point(ne.x, ne.y, entity.construction);
                created.push(ns_id);
                created.push(ne_id);
                if let Some(line_id) = sketch.add_line(ns_id, ne_id, entity.construction) {
                    created.push(line_id);
                }
            }
            EntityShape::Arc { center, radius, start_angle, end_angle } => {
                let Some((cx, cy)) = sketch.get_entity(center).and_then(|e| e.as_point()) else {
                    return ToolCommit::default();
                };
                let nc = reflect_point(Vec2::new(cx, cy), a, b);
                let nc_id = sketch.add_point(nc.x, nc.y, entity.construction);
                created.push(nc_id);
                // Reflection reverses orientation: the mirrored sweep runs
                // from the reflected end angle to the reflected start angle
                // to stay CCW in the new frame.
                let axis_angle = (b - a).angle();
                let reflect_angle = |theta: f64| 2.0 * axis_angle - theta;
                let new_start = reflect_angle(end_angle);
                let new_end = reflect_angle(start_angle);
                if let Some(arc_id) = sketch.add_arc(nc_id, radius, new_start, new_end, entity.construction) {
                    created.push(arc_id);
                }
            }
            EntityShape::Circle { center, radius } => {
                let Some((cx, cy)) = sketch.get_entity(center).and_then(|e| e.as_point()) else {
                    return ToolCommit::default();
                };
                let nc = reflect_point(Vec2::new(cx, cy), a, b);
                let nc_id = sketch.add_point(nc.x, nc.y, entity.construction);
                created.push(nc_id);
                if let Some(circle_id) = sketch.add_circle(nc_id, radius, entity.construction) {
                    created.push(circle_id);
                }
            }
            _ => return ToolCommit::default(),
        }

        ToolCommit {
            created_entities: created,
            deleted_entities: Vec::new(),
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, _snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        PreviewGeometry::None
    }

    fn cancel(&mut self) {
        self.axis = None;
        self.hovered = None;
    }
}
