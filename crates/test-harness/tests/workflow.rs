//! End-to-end: draw with the tool manager, detect the resulting face, then
//! solve the sketch with the inferred constraints in place.

use approx::assert_relative_eq;
use sketch_store::Sketch;
use sketch_tools::{AutoConstrainer, MouseButton, ToolKind, ToolManager};
use waffle_types::Vec2;

#[test]
fn rectangle_tool_drawing_detects_as_one_face() {
    let mut sketch = Sketch::new();
    let mut manager = ToolManager::new();
    manager.set_active_tool(sketch_tools::make_tool(ToolKind::Rectangle, AutoConstrainer::default()).unwrap());

    manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(0.0, 0.0));
    manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(4.0, 3.0));

    let detector = loop_extractor::LoopDetector::new(loop_extractor::LoopDetectorConfig::default());
    let result = detector.detect(&sketch, None);

    assert_eq!(result.faces.len(), 1);
    assert_relative_eq!(result.faces[0].area(), 12.0, epsilon = 1e-6);
}

#[test]
fn line_tool_crossing_an_existing_line_splits_both() {
    let mut sketch = Sketch::new();
    let a = sketch.add_point(-1.0, 0.0, false);
    let b = sketch.add_point(1.0, 0.0, false);
    sketch.add_line(a, b, false).unwrap();

    let mut manager = ToolManager::new();
    manager.set_active_tool(sketch_tools::make_tool(ToolKind::Line, AutoConstrainer::default()).unwrap());
    manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(0.0, -1.0));
    let result = manager.on_mouse_press(&mut sketch, MouseButton::Left, Vec2::new(0.0, 1.0));

    assert_eq!(result.intersections.len(), 1);
    assert_eq!(result.intersections[0].entities_split, 2);
    // Original two lines plus two splits each producing two segments: four
    // line entities remain (the two originals are replaced, not kept).
    let line_count = sketch.entities().filter(|e| e.kind() == sketch_store::EntityKind::Line).count();
    assert_eq!(line_count, 4);
}
