//! The `SketchTool` state-machine trait, grounded on `SketchTool.h`'s
//! abstract base: a uniform press/move/release/key/cancel surface over a
//! small per-tool state machine, fed the current best snap and inferred
//! constraints by the [`crate::ToolManager`].

use sketch_store::{EntityId, Sketch};
use snap_resolver::SnapResult;
use waffle_types::Vec2;

use crate::auto_constrain::InferredConstraint;

/// Where a tool's state machine currently sits. Most tools only ever occupy
/// `Idle`/`FirstClick`; three-click tools (Arc, Ellipse) also pass through
/// `Drawing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    FirstClick,
    Drawing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Other,
}

/// A lightweight description of what a tool would like drawn as a live
/// preview, returned by [`SketchTool::preview`] instead of an actual render
/// call — rendering itself is out of scope here.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewGeometry {
    None,
    Line { a: Vec2, b: Vec2 },
    Rectangle { corners: [Vec2; 4] },
    Circle { center: Vec2, radius: f64 },
    Arc { center: Vec2, radius: f64, start_angle: f64, end_angle: f64 },
    Ellipse { center: Vec2, major_radius: f64, minor_radius: f64, rotation: f64 },
}

/// Result of a mutating tool event: whatever entities got committed this
/// call, for the tool manager to hand to the intersection materializer and
/// auto-constrainer.
#[derive(Debug, Clone, Default)]
pub struct ToolCommit {
    pub created_entities: Vec<EntityId>,
    pub deleted_entities: Vec<EntityId>,
}

/// A drawing/editing tool's state machine. Every method takes the
/// snap-resolved cursor position rather than a raw one — callers must run
/// the snap resolver first (see [`crate::ToolManager`]).
pub trait SketchTool {
    fn name(&self) -> &'static str;

    fn state(&self) -> ToolState;

    fn is_active(&self) -> bool {
        self.state() != ToolState::Idle
    }

    fn on_mouse_press(
        &mut self,
        sketch: &mut Sketch,
        button: MouseButton,
        snapped_pos: Vec2,
        snap: &SnapResult,
        inferred: &[InferredConstraint],
    ) -> ToolCommit;

    fn on_mouse_move(&mut self, sketch: &Sketch, snapped_pos: Vec2, snap: &SnapResult) -> PreviewGeometry;

    fn on_mouse_release(&mut self, sketch: &mut Sketch, snapped_pos: Vec2) -> ToolCommit {
        let _ = (sketch, snapped_pos);
        ToolCommit::default()
    }

    fn on_key_press(&mut self, key: Key) {
        if key == Key::Escape {
            self.cancel();
        }
    }

    fn cancel(&mut self);
}
