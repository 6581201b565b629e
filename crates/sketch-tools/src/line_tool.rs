//! Line tool: two-click line creation with polyline continuation, grounded
//! on `LineTool.cpp`.

use sketch_store::{EntityId, Sketch};
use snap_resolver::SnapResult;
use waffle_types::Vec2;

use crate::auto_constrain::{AutoConstrainer, DrawingContext, InferredConstraint};
use crate::tool::{MouseButton, PreviewGeometry, SketchTool, ToolCommit, ToolState};

const MIN_GEOMETRY_SIZE: f64 = 1e-6;

pub struct LineTool {
    state: ToolState,
    start_point: Option<EntityId>,
    start_pos: Vec2,
    previous_line: Option<EntityId>,
    auto_constrainer: AutoConstrainer,
}

impl LineTool {
    pub fn new(auto_constrainer: AutoConstrainer) -> Self {
        Self {
            state: ToolState::Idle,
            start_point: None,
            start_pos: Vec2::ZERO,
            previous_line: None,
            auto_constrainer,
        }
    }

    /// Resolves a snap result to a concrete point entity, creating a
    /// freestanding point if the snap didn't land on one already.
    fn resolve_point(sketch: &mut Sketch, snapped_pos: Vec2, snap: &SnapResult) -> EntityId {
        if snap.snapped {
            if let Some(id) = snap.point_id {
                return id;
            }
        }
        sketch.add_point(snapped_pos.x, snapped_pos.y, false)
    }
}

impl SketchTool for LineTool {
    fn name(&self) -> &'static str {
        "Line"
    }

    fn state(&self) -> ToolState {
        self.state
    }

    fn on_mouse_press(
        &mut self,
        sketch: &mut Sketch,
        button: MouseButton,
        snapped_pos: Vec2,
        snap: &SnapResult,
        _inferred: &[InferredConstraint],
    ) -> ToolCommit {
        if button == MouseButton::Right {
            self.cancel();
            return ToolCommit::default();
        }

        match self.state {
            ToolState::Idle => {
                let point = Self::resolve_point(sketch, snapped_pos, snap);
                self.start_point = Some(point);
                self.start_pos = snapped_pos;
                self.state = ToolState::FirstClick;
                ToolCommit::default()
            }
            ToolState::FirstClick => {
                let Some(start) = self.start_point else {
                    self.cancel();
                    return ToolCommit::default();
                };
                if self.start_pos.distance(snapped_pos) < MIN_GEOMETRY_SIZE {
                    // Degenerate click at the same spot; stay put rather than
                    // commit a zero-length line.
                    return ToolCommit::default();
                }
                let end = Self::resolve_point(sketch, snapped_pos, snap);
                let Some(line_id) = sketch.add_line(start, end, false) else {
                    return ToolCommit::default();
                };

                let context = DrawingContext {
                    active_entity: Some(line_id),
                    previous_entity: self.previous_line,
                    is_polyline_mode: self.previous_line.is_some(),
                };
                let inferred = self.auto_constrainer.infer_line_constraints(self.start_pos, snapped_pos, line_id, sketch, &context);
                for c in self.auto_constrainer.filter_for_auto_apply(&inferred) {
                    sketch.add_constraint(c.kind);
                }

                // Continue the polyline: the just-created end becomes the
                // next segment's start, tool stays in FirstClick.
                self.previous_line = Some(line_id);
                self.start_point = Some(end);
                self.start_pos = snapped_pos;

                ToolCommit {
                    created_entities: vec![line_id],
                    deleted_entities: Vec::new(),
                }
            }
            ToolState::Drawing => ToolCommit::default(),
        }
    }

    fn on_mouse_move(&mut self, _sketch: &Sketch, snapped_pos: Vec2, _snap: &SnapResult) -> PreviewGeometry {
        match self.state {
            ToolState::FirstClick => PreviewGeometry::Line { a: self.start_pos, b: snapped_pos },
            _ => PreviewGeometry::None,
        }
    }

    fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.start_point = None;
        self.previous_line = None;
        self.start_pos = Vec2::ZERO;
    }
}

impl Default for LineTool {
    fn default() -> Self {
        Self::new(AutoConstrainer::default())
    }
}
