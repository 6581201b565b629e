//! Tool state machines and the intersection materializer:
//! turns pointer events into sketch mutations, grounded on the `tools/`
//! directory's `SketchTool` hierarchy plus `IntersectionManager` and
//! `AutoConstrainer`.

mod auto_constrain;
mod edit_tools;
mod intersections;
mod line_tool;
mod manager;
mod shape_tools;
mod tool;

pub use auto_constrain::{AutoConstrainer, AutoConstrainerConfig, DrawingContext, InferredConstraint};
pub use edit_tools::{MirrorTool, TrimTool};
pub use intersections::{IntersectionManager, IntersectionResult, MIN_POINT_SPACING};
pub use line_tool::LineTool;
pub use manager::{ToolEventResult, ToolManager};
pub use shape_tools::{ArcTool, CircleTool, EllipseTool, RectangleTool};
pub use tool::{Key, MouseButton, PreviewGeometry, SketchTool, ToolCommit, ToolState};

/// Which concrete tool is active, grounded on `SketchToolManager.h`'s
/// `ToolType` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    None,
    Line,
    Rectangle,
    Circle,
    Arc,
    Ellipse,
    Trim,
    Mirror,
}

/// Builds a freshly-reset tool instance for the given kind, sharing one
/// [`AutoConstrainer`] configuration across every tool that infers
/// constraints.
pub fn make_tool(kind: ToolKind, auto_constrainer: AutoConstrainer) -> Option<Box<dyn SketchTool>> {
    match kind {
        ToolKind::None => None,
        ToolKind::Line => Some(Box::new(LineTool::new(auto_constrainer))),
        ToolKind::Rectangle => Some(Box::new(RectangleTool::new())),
        ToolKind::Circle => Some(Box::new(CircleTool::new(auto_constrainer))),
        ToolKind::Arc => Some(Box::new(ArcTool::new(auto_constrainer))),
        ToolKind::Ellipse => Some(Box::new(EllipseTool::new())),
        ToolKind::Trim => Some(Box::new(TrimTool::new())),
        ToolKind::Mirror => Some(Box::new(MirrorTool::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_store::Sketch;
    use waffle_types::Vec2;

    fn press(tool: &mut dyn SketchTool, sketch: &mut Sketch, pos: Vec2) -> ToolCommit {
        let snap = snap_resolver::SnapResult::none();
        tool.on_mouse_press(sketch, MouseButton::Left, pos, &snap, &[])
    }

    #[test]
    fn line_tool_creates_a_line_on_second_click() {
        let mut sketch = Sketch::new();
        let mut tool = LineTool::default();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(1.0, 0.0));
        assert_eq!(commit.created_entities.len(), 1);
        assert_eq!(tool.state(), ToolState::FirstClick);
    }

    #[test]
    fn line_tool_continues_polyline_from_previous_end() {
        let mut sketch = Sketch::new();
        let mut tool = LineTool::default();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        press(&mut tool, &mut sketch, Vec2::new(1.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(1.0, 1.0));
        assert_eq!(commit.created_entities.len(), 1);
        assert_eq!(sketch.entities().count(), 5); // 3 points + 2 lines
    }

    #[test]
    fn line_tool_escape_cancels() {
        let mut sketch = Sketch::new();
        let mut tool = LineTool::default();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        tool.on_key_press(Key::Escape);
        assert_eq!(tool.state(), ToolState::Idle);
    }

    #[test]
    fn rectangle_tool_creates_four_points_and_four_lines() {
        let mut sketch = Sketch::new();
        let mut tool = RectangleTool::new();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(2.0, 1.0));
        assert_eq!(commit.created_entities.len(), 8);
        assert_eq!(tool.state(), ToolState::Idle);
    }

    #[test]
    fn circle_tool_radius_is_distance_to_second_click() {
        let mut sketch = Sketch::new();
        let mut tool = CircleTool::default();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(3.0, 4.0));
        let circle_id = commit.created_entities[0];
        let sketch_store::EntityShape::Circle { radius, .. } = &sketch.get_entity(circle_id).unwrap().shape else {
            panic!("expected circle");
        };
        assert!((radius - 5.0).abs() < 1e-9);
    }

    #[test]
    fn arc_tool_fails_commit_on_colinear_points() {
        let mut sketch = Sketch::new();
        let mut tool = ArcTool::default();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        press(&mut tool, &mut sketch, Vec2::new(1.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(2.0, 0.0));
        assert!(commit.created_entities.is_empty());
        assert_eq!(tool.state(), ToolState::Drawing);
    }

    #[test]
    fn arc_tool_commits_circumcircle_arc() {
        let mut sketch = Sketch::new();
        let mut tool = ArcTool::default();
        press(&mut tool, &mut sketch, Vec2::new(1.0, 0.0));
        press(&mut tool, &mut sketch, Vec2::new(0.0, 1.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(-1.0, 0.0));
        assert_eq!(commit.created_entities.len(), 2);
    }

    #[test]
    fn ellipse_tool_enforces_major_greater_than_minor() {
        let mut sketch = Sketch::new();
        let mut tool = EllipseTool::new();
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        press(&mut tool, &mut sketch, Vec2::new(1.0, 0.0));
        let commit = press(&mut tool, &mut sketch, Vec2::new(0.5, 5.0));
        let ellipse_id = commit.created_entities[1];
        let sketch_store::EntityShape::Ellipse { major_radius, minor_radius, .. } = &sketch.get_entity(ellipse_id).unwrap().shape else {
            panic!("expected ellipse");
        };
        assert!(major_radius >= minor_radius);
    }

    #[test]
    fn trim_tool_deletes_hovered_non_point_entity() {
        let mut sketch = Sketch::new();
        let a = sketch.add_point(0.0, 0.0, false);
        let b = sketch.add_point(1.0, 0.0, false);
        let line = sketch.add_line(a, b, false).unwrap();
        let mut tool = TrimTool::new();
        tool.set_hovered(Some(line));
        let commit = press(&mut tool, &mut sketch, Vec2::new(0.5, 0.0));
        assert_eq!(commit.deleted_entities, vec![line]);
        assert!(sketch.get_entity(line).is_none());
    }

    #[test]
    fn mirror_tool_clones_a_line_across_the_axis() {
        let mut sketch = Sketch::new();
        let axis_a = sketch.add_point(0.0, -1.0, false);
        let axis_b = sketch.add_point(0.0, 1.0, false);
        let axis = sketch.add_line(axis_a, axis_b, false).unwrap();
        let a = sketch.add_point(1.0, 0.0, false);
        let b = sketch.add_point(2.0, 0.0, false);
        let target = sketch.add_line(a, b, false).unwrap();

        let mut tool = MirrorTool::new();
        tool.set_hovered(Some(axis));
        press(&mut tool, &mut sketch, Vec2::new(0.0, 0.0));
        tool.set_hovered(Some(target));
        let commit = press(&mut tool, &mut sketch, Vec2::new(1.5, 0.0));

        assert_eq!(commit.created_entities.len(), 3);
        let mirrored_line = *commit.created_entities.last().unwrap();
        let sketch_store::EntityShape::Line { start, end } = &sketch.get_entity(mirrored_line).unwrap().shape else {
            panic!("expected line");
        };
        let (sx, _) = sketch.get_entity(*start).unwrap().as_point().unwrap();
        let (ex, _) = sketch.get_entity(*end).unwrap().as_point().unwrap();
        assert!(sx < 0.0 && ex < 0.0);
    }

    #[test]
    fn tool_manager_routes_press_and_materializes_intersections() {
        let mut sketch = Sketch::new();
        let a = sketch.add_point(-1.0, 0.0, false);
        let b = sketch.add_point(1.0, 0.0, false);
        sketch.add_line(a, b, false).unwrap();

        let mut manager = ToolManager::new();
        manager.set_active_tool(make_tool(ToolKind::Line, AutoConstrainer::default()).unwrap());
        manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(0.0, -1.0));
        let result = manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(0.0, 1.0));

        assert_eq!(result.commit.created_entities.len(), 1);
        assert_eq!(result.intersections.len(), 1);
        assert_eq!(result.intersections[0].entities_split, 2);
    }
}
