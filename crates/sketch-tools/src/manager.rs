//! Tool manager: routes pointer/key events to the active tool, resolving
//! snaps and inferred constraints first, and runs the intersection
//! materializer after every commit. Grounded on `SketchToolManager.h`/`.cpp`.

use sketch_store::{EntityKind, Sketch};
use snap_resolver::{SnapResolver, SnapResult};
use waffle_types::Vec2;

use crate::intersections::{IntersectionManager, IntersectionResult};
use crate::tool::{Key, MouseButton, PreviewGeometry, SketchTool, ToolCommit};

/// Aggregate result of a single pointer event, for the UI layer to react to
/// (e.g. refresh a display list, flash newly split segments).
#[derive(Debug, Clone, Default)]
pub struct ToolEventResult {
    pub commit: ToolCommit,
    pub intersections: Vec<IntersectionResult>,
}

pub struct ToolManager {
    active: Option<Box<dyn SketchTool>>,
    snap_resolver: SnapResolver,
    intersection_manager: IntersectionManager,
    last_snap: SnapResult,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            active: None,
            snap_resolver: SnapResolver::default(),
            intersection_manager: IntersectionManager::default(),
            last_snap: SnapResult::none(),
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_tool(&mut self, tool: Box<dyn SketchTool>) {
        if let Some(mut previous) = self.active.take() {
            previous.cancel();
        }
        self.active = Some(tool);
    }

    pub fn clear_active_tool(&mut self) {
        if let Some(mut previous) = self.active.take() {
            previous.cancel();
        }
    }

    pub fn active_tool_name(&self) -> Option<&'static str> {
        self.active.as_ref().map(|t| t.name())
    }

    pub fn snap_resolver_mut(&mut self) -> &mut SnapResolver {
        &mut self.snap_resolver
    }

    pub fn last_snap(&self) -> &SnapResult {
        &self.last_snap
    }

    /// Resolves the best snap for `cursor`, without involving the active
    /// tool. Callers use this for guide-overlay rendering on plain moves.
    pub fn resolve_snap(&mut self, sketch: &Sketch, cursor: Vec2) -> SnapResult {
        let snap = self.snap_resolver.find_best_snap(sketch, cursor);
        self.last_snap = snap.clone();
        snap
    }

    pub fn on_mouse_move(&mut self, sketch: &Sketch, cursor: Vec2) -> PreviewGeometry {
        let snap = self.resolve_snap(sketch, cursor);
        let pos = if snap.snapped { snap.position } else { cursor };
        match self.active.as_mut() {
            Some(tool) => tool.on_mouse_move(sketch, pos, &snap),
            None => PreviewGeometry::None,
        }
    }

    pub fn on_mouse_press(&mut self, sketch: &mut Sketch, button: MouseButton, cursor: Vec2) -> ToolEventResult {
        let snap = self.resolve_snap(sketch, cursor);
        let pos = if snap.snapped { snap.position } else { cursor };
        let Some(tool) = self.active.as_mut() else {
            return ToolEventResult::default();
        };

        let commit = tool.on_mouse_press(sketch, button, pos, &snap, &[]);
        let intersections = self.materialize(sketch, &commit);
        ToolEventResult { commit, intersections }
    }

    pub fn on_mouse_release(&mut self, sketch: &mut Sketch, cursor: Vec2) -> ToolEventResult {
        let snap = self.resolve_snap(sketch, cursor);
        let pos = if snap.snapped { snap.position } else { cursor };
        let Some(tool) = self.active.as_mut() else {
            return ToolEventResult::default();
        };
        let commit = tool.on_mouse_release(sketch, pos);
        let intersections = self.materialize(sketch, &commit);
        ToolEventResult { commit, intersections }
    }

    pub fn on_key_press(&mut self, key: Key) {
        if let Some(tool) = self.active.as_mut() {
            tool.on_key_press(key);
        }
    }

    /// Runs the intersection materializer over every curve/line the commit
    /// just created (circles are excluded; they are never split).
    fn materialize(&self, sketch: &mut Sketch, commit: &ToolCommit) -> Vec<IntersectionResult> {
        if !self.intersection_manager.is_enabled() {
            return Vec::new();
        }
        commit
            .created_entities
            .iter()
            .filter(|id| matches!(sketch.get_entity(**id).map(|e| e.kind()), Some(EntityKind::Line) | Some(EntityKind::Arc)))
            .map(|id| self.intersection_manager.process_intersections(*id, sketch))
            .collect()
    }
}
