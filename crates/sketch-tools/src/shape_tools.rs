//! Rectangle, Circle, Arc, and Ellipse tools, grounded on `CircleTool.cpp`,
//! `ArcTool.cpp`/`.h`, and `EllipseTool.cpp`/`.h`.

use sketch_store::{EntityId, Sketch};
use snap_resolver::SnapResult;
use waffle_types::Vec2;

use crate::auto_constrain::{AutoConstrainer, InferredConstraint};
use crate::tool::{MouseButton, PreviewGeometry, SketchTool, ToolCommit, ToolState};

const MIN_GEOMETRY_SIZE: f64 = 1e-6;

fn resolve_point(sketch: &mut Sketch, pos: Vec2, snap: &SnapResult) -> EntityId {
    if snap.snapped {
        if let Some(id) = snap.point_id {
            return id;
        }
    }
    sketch.add_point(pos.x, pos.y, false)
}

/// Idle → FirstClick (first corner) → commits on the second press, creating
/// four lines sharing four points (axis-aligned in sketch space).
#[derive(Default)]
pub struct RectangleTool {
    state: ToolState,
    first_corner: Option<Vec2>,
}

impl RectangleTool {
    pub fn new() -> Self {
        Self::default()
    }
}

fn rectangle_corners(a: Vec2, b: Vec2) -> [Vec2; 4] {
    [a, Vec2::new(b.x, a.y), b, Vec2::new(a.x, b.y)]
}

impl SketchTool for RectangleTool {
    fn name(&self) -> &'static str {
        "Rectangle"
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, button: MouseButton, snapped_pos: Vec2, _snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        if button == MouseButton::Right {
            self.cancel();
            return ToolCommit::default();
        }
        match self.state {
            ToolState::Idle => {
                self.first_corner = Some(snapped_pos);
                self.state = ToolState::FirstClick;
                ToolCommit::default()
            }
            ToolState::FirstClick => {
                let Some(a) = self.first_corner else {
                    self.cancel();
                    return ToolCommit::default();
                };
                if a.distance(snapped_pos) < MIN_GEOMETRY_SIZE {
                    return ToolCommit::default();
                }
                let corners = rectangle_corners(a, snapped_pos);
                let point_ids: Vec<EntityId> = corners.iter().map(|p| sketch.add_point(p.x, p.y, false)).collect();
                let mut created = point_ids.clone();
                for i in 0..4 {
                    if let Some(line) = sketch.add_line(point_ids[i], point_ids[(i + 1) % 4], false) {
                        created.push(line);
                    }
                }
                self.cancel();
                ToolCommit {
                    created_entities: created,
                    deleted_entities: Vec::new(),
                }
            }
            ToolState::Drawing => ToolCommit::default(),
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        match (self.state, self.first_corner) {
            (ToolState::FirstClick, Some(a)) => PreviewGeometry::Rectangle { corners: rectangle_corners(a, snapped_pos) },
            _ => PreviewGeometry::None,
        }
    }

    fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.first_corner = None;
    }
}

/// Idle → FirstClick (center) → commits on the second press; radius is the
/// distance to the second click.
pub struct CircleTool {
    state: ToolState,
    center_point: Option<EntityId>,
    center_pos: Vec2,
    auto_constrainer: AutoConstrainer,
}

impl CircleTool {
    pub fn new(auto_constrainer: AutoConstrainer) -> Self {
        Self {
            state: ToolState::Idle,
            center_point: None,
            center_pos: Vec2::ZERO,
            auto_constrainer,
        }
    }
}

impl Default for CircleTool {
    fn default() -> Self {
        Self::new(AutoConstrainer::default())
    }
}

impl SketchTool for CircleTool {
    fn name(&self) -> &'static str {
        "Circle"
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, button: MouseButton, snapped_pos: Vec2, snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        if button == MouseButton::Right {
            self.cancel();
            return ToolCommit::default();
        }
        match self.state {
            ToolState::Idle => {
                let center = resolve_point(sketch, snapped_pos, snap);
                self.center_point = Some(center);
                self.center_pos = snapped_pos;
                self.state = ToolState::FirstClick;
                ToolCommit::default()
            }
            ToolState::FirstClick => {
                let Some(center) = self.center_point else {
                    self.cancel();
                    return ToolCommit::default();
                };
                let radius = self.center_pos.distance(snapped_pos);
                if radius < MIN_GEOMETRY_SIZE {
                    return ToolCommit::default();
                }
                let Some(circle_id) = sketch.add_circle(center, radius, false) else {
                    return ToolCommit::default();
                };
                let inferred = self.auto_constrainer.infer_circle_constraints(self.center_pos, radius, circle_id, sketch);
                for c in self.auto_constrainer.filter_for_auto_apply(&inferred) {
                    sketch.add_constraint(c.kind);
                }
                self.cancel();
                ToolCommit {
                    created_entities: vec![circle_id],
                    deleted_entities: Vec::new(),
                }
            }
            ToolState::Drawing => ToolCommit::default(),
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        match self.state {
            ToolState::FirstClick => PreviewGeometry::Circle {
                center: self.center_pos,
                radius: self.center_pos.distance(snapped_pos),
            },
            _ => PreviewGeometry::None,
        }
    }

    fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.center_point = None;
        self.center_pos = Vec2::ZERO;
    }
}

/// Idle → FirstClick (start) → Drawing (midpoint captured) → commits on the
/// third press; fits the circumcircle of the three picked points and assigns
/// start/end angles so the middle point lies on the resulting CCW sweep.
pub struct ArcTool {
    state: ToolState,
    start_pos: Option<Vec2>,
    mid_pos: Option<Vec2>,
    auto_constrainer: AutoConstrainer,
}

impl ArcTool {
    pub fn new(auto_constrainer: AutoConstrainer) -> Self {
        Self {
            state: ToolState::Idle,
            start_pos: None,
            mid_pos: None,
            auto_constrainer,
        }
    }
}

impl Default for ArcTool {
    fn default() -> Self {
        Self::new(AutoConstrainer::default())
    }
}

/// Circumcircle of three points. Returns `None` when the points are
/// (nearly) colinear.
fn circumcircle(a: Vec2, b: Vec2, c: Vec2) -> Option<(Vec2, f64)> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-9 {
        return None;
    }
    let ux = ((a.x * a.x + a.y * a.y) * (b.y - c.y) + (b.x * b.x + b.y * b.y) * (c.y - a.y) + (c.x * c.x + c.y * c.y) * (a.y - b.y)) / d;
    let uy = ((a.x * a.x + a.y * a.y) * (c.x - b.x) + (b.x * b.x + b.y * b.y) * (a.x - c.x) + (c.x * c.x + c.y * c.y) * (b.x - a.x)) / d;
    let center = Vec2::new(ux, uy);
    Some((center, center.distance(a)))
}

/// Start/end angles (radians, CCW) such that sweeping CCW from start to end
/// passes through `mid`'s angle.
fn sweep_through(center: Vec2, start: Vec2, mid: Vec2, end: Vec2) -> (f64, f64) {
    let start_angle = (start - center).angle();
    let mid_angle = waffle_types::normalize_sweep(start_angle, (mid - center).angle());
    let end_angle_rel = waffle_types::normalize_sweep(start_angle, (end - center).angle());
    if mid_angle <= end_angle_rel {
        (start_angle, start_angle + end_angle_rel)
    } else {
        // mid lies on the far side; sweep the other way by swapping which
        // endpoint is "start" for angle purposes while keeping a CCW sweep.
        let end_angle = (end - center).angle();
        (end_angle, end_angle + waffle_types::normalize_sweep(end_angle, start_angle))
    }
}

impl SketchTool for ArcTool {
    fn name(&self) -> &'static str {
        "Arc"
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, button: MouseButton, snapped_pos: Vec2, _snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        if button == MouseButton::Right {
            self.cancel();
            return ToolCommit::default();
        }
        match self.state {
            ToolState::Idle => {
                self.start_pos = Some(snapped_pos);
                self.state = ToolState::FirstClick;
                ToolCommit::default()
            }
            ToolState::FirstClick => {
                let Some(start) = self.start_pos else {
                    self.cancel();
                    return ToolCommit::default();
                };
                if start.distance(snapped_pos) < MIN_GEOMETRY_SIZE {
                    return ToolCommit::default();
                }
                self.mid_pos = Some(snapped_pos);
                self.state = ToolState::Drawing;
                ToolCommit::default()
            }
            ToolState::Drawing => {
                let (Some(start), Some(mid)) = (self.start_pos, self.mid_pos) else {
                    self.cancel();
                    return ToolCommit::default();
                };
                let end = snapped_pos;
                let Some((center, radius)) = circumcircle(start, mid, end) else {
                    // Colinear three points: fail the commit, stay in Drawing
                    // so the user can pick a different third point.
                    return ToolCommit::default();
                };
                let (start_angle, end_angle) = sweep_through(center, start, mid, end);
                let center_id = sketch.add_point(center.x, center.y, false);
                let Some(arc_id) = sketch.add_arc(center_id, radius, start_angle, end_angle, false) else {
                    return ToolCommit::default();
                };
                let inferred = self.auto_constrainer.infer_arc_constraints(center, radius, start_angle, arc_id, sketch);
                for c in self.auto_constrainer.filter_for_auto_apply(&inferred) {
                    sketch.add_constraint(c.kind);
                }
                self.cancel();
                ToolCommit {
                    created_entities: vec![center_id, arc_id],
                    deleted_entities: Vec::new(),
                }
            }
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        match (self.state, self.start_pos, self.mid_pos) {
            (ToolState::FirstClick, Some(a), _) => PreviewGeometry::Line { a, b: snapped_pos },
            (ToolState::Drawing, Some(start), Some(mid)) => match circumcircle(start, mid, snapped_pos) {
                Some((center, radius)) => {
                    let (start_angle, end_angle) = sweep_through(center, start, mid, snapped_pos);
                    PreviewGeometry::Arc { center, radius, start_angle, end_angle }
                }
                None => PreviewGeometry::None,
            },
            _ => PreviewGeometry::None,
        }
    }

    fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.start_pos = None;
        self.mid_pos = None;
    }
}

/// Idle → FirstClick (center) → Drawing (major endpoint) → commits on third
/// press; minor radius is the perpendicular distance from the cursor to the
/// major axis, with `major >= minor` enforced.
pub struct EllipseTool {
    state: ToolState,
    center_pos: Option<Vec2>,
    major_pos: Option<Vec2>,
}

impl EllipseTool {
    pub fn new() -> Self {
        Self {
            state: ToolState::Idle,
            center_pos: None,
            major_pos: None,
        }
    }
}

impl Default for EllipseTool {
    fn default() -> Self {
        Self::new()
    }
}

fn ellipse_params(center: Vec2, major_end: Vec2, cursor: Vec2) -> (f64, f64, f64) {
    let axis = major_end - center;
    let major_radius = axis.length();
    let rotation = axis.angle();
    let minor_radius = if major_radius < 1e-9 {
        0.0
    } else {
        (cursor - center).cross(axis.normalized()).abs()
    };
    (major_radius.max(minor_radius), minor_radius.min(major_radius), rotation)
}

impl SketchTool for EllipseTool {
    fn name(&self) -> &'static str {
        "Ellipse"
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn on_mouse_press(&mut self, sketch: &mut Sketch, button: MouseButton, snapped_pos: Vec2, _snap: &SnapResult, _inferred: &[InferredConstraint]) -> ToolCommit {
        if button == MouseButton::Right {
            self.cancel();
            return ToolCommit::default();
        }
        match self.state {
            ToolState::Idle => {
                self.center_pos = Some(snapped_pos);
                self.state = ToolState::FirstClick;
                ToolCommit::default()
            }
            ToolState::FirstClick => {
                let Some(center) = self.center_pos else {
                    self.cancel();
                    return ToolCommit::default();
                };
                if center.distance(snapped_pos) < MIN_GEOMETRY_SIZE {
                    return ToolCommit::default();
                }
                self.major_pos = Some(snapped_pos);
                self.state = ToolState::Drawing;
                ToolCommit::default()
            }
            ToolState::Drawing => {
                let (Some(center), Some(major_end)) = (self.center_pos, self.major_pos) else {
                    self.cancel();
                    return ToolCommit::default();
                };
                let (major_radius, minor_radius, rotation) = ellipse_params(center, major_end, snapped_pos);
                if major_radius < MIN_GEOMETRY_SIZE {
                    return ToolCommit::default();
                }
                let center_id = sketch.add_point(center.x, center.y, false);
                let Some(ellipse_id) = sketch.add_ellipse(center_id, major_radius, minor_radius, rotation, false) else {
                    return ToolCommit::default();
                };
                self.cancel();
                ToolCommit {
                    created_entities: vec![center_id, ellipse_id],
                    deleted_entities: Vec::new(),
                }
            }
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        match (self.state, self.center_pos, self.major_pos) {
            (ToolState::FirstClick, Some(center), _) => PreviewGeometry::Line { a: center, b: snapped_pos },
            (ToolState::Drawing, Some(center), Some(major_end)) => {
                let (major_radius, minor_radius, rotation) = ellipse_params(center, major_end, snapped_pos);
                PreviewGeometry::Ellipse { center, major_radius, minor_radius, rotation }
            }
            _ => PreviewGeometry::None,
        }
    }

    fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.center_pos = None;
        self.major_pos = None;
    }
}
