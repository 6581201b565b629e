//! Concrete end-to-end scenarios exercised across crates.

use approx::assert_relative_eq;
use snap_resolver::{SnapConfig, SnapResolver, SnapType};
use waffle_types::Vec2;

#[test]
fn scenario_1_snap_vertex() {
    let mut sketch = sketch_store::Sketch::new();
    sketch.add_point(5.0, 5.0, false);

    // Only a single isolated point exists, so the default (all-finders-on)
    // config still resolves to Vertex: no other snap type has a candidate.
    let mut resolver = SnapResolver::new(SnapConfig::default());

    let result = resolver.find_best_snap(&sketch, Vec2::new(5.2, 5.1));
    assert!(result.snapped);
    assert_eq!(result.snap_type, SnapType::Vertex);
    assert_relative_eq!(result.position.x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(result.position.y, 5.0, epsilon = 1e-9);
}

#[test]
fn scenario_2_loop_on_square() {
    let (sketch, _lines) = test_harness::square_sketch(10.0);
    let detector = loop_extractor::LoopDetector::new(loop_extractor::LoopDetectorConfig::default());
    let result = detector.detect(&sketch, None);

    assert_eq!(result.faces.len(), 1);
    let outer = &result.faces[0].outer;
    assert!(outer.signed_area > 0.0, "outer loop must be CCW");
    assert_relative_eq!(outer.area(), 100.0, epsilon = 1e-6);
}

#[test]
fn scenario_3_drag_rejection() {
    use constraint_solver::DragOutcome;

    let mut sketch = sketch_store::Sketch::new();
    let a = sketch.add_point(0.0, 0.0, false);
    let b = sketch.add_point(10.0, 0.0, false);
    sketch.add_fixed(a);
    sketch.add_distance(a, b, 10.0);

    let session = constraint_solver::begin_point_drag(&sketch, b).unwrap();
    let outcome = constraint_solver::solve_with_drag(&mut sketch, &session, Vec2::new(5.0, 0.0), &[a], &constraint_solver::SolverConfig::default());

    match outcome {
        DragOutcome::Rejected { reason, .. } => assert_eq!(reason, "Dragged point cannot reach target"),
        DragOutcome::Applied(_) => panic!("expected the drag to be rejected"),
    }

    constraint_solver::end_point_drag(session);
    let (bx, by) = sketch.get_entity(b).unwrap().as_point().unwrap();
    assert_relative_eq!(bx, 10.0, epsilon = 1e-6);
    assert_relative_eq!(by, 0.0, epsilon = 1e-6);
}

#[test]
fn scenario_4_reference_locked_line() {
    let mut sketch = sketch_store::Sketch::new();
    let a = sketch.add_point(0.0, 0.0, false);
    let b = sketch.add_point(1.0, 0.0, false);
    let line = sketch.add_line(a, b, false).unwrap();
    sketch.set_entity_reference_locked(line, true);

    assert!(!sketch.remove_entity(line));
    assert!(sketch.get_entity(line).is_some());
    assert!(sketch.add_horizontal(line).is_none());
    assert_eq!(sketch.constraints().count(), 0);
}

#[test]
fn scenario_5_split_too_close() {
    let mut sketch = sketch_store::Sketch::new();
    let a = sketch.add_point(0.0, 0.0, false);
    let b = sketch.add_point(10.0, 0.0, false);
    let line = sketch.add_line(a, b, false).unwrap();

    let result = sketch.split_line_at(line, Vec2::new(0.05, 0.0));
    assert!(result.is_none());
    assert!(sketch.get_entity(line).is_some());
}

#[test]
fn scenario_6_dependency_edge() {
    use feature_graph::{BooleanMode, DependencyGraph, ExtrudeParams, FilletChamferParams, OperationInput, OperationParams, OperationRecord, OperationType};
    use uuid::Uuid;

    let o1 = Uuid::new_v4();
    let o2 = Uuid::new_v4();
    let sketch_id = Uuid::new_v4();
    let b1 = Uuid::new_v4();
    let edge = Uuid::new_v4();

    let op1 = OperationRecord {
        op_id: o1,
        op_type: OperationType::Extrude,
        input: OperationInput::SketchRegionRef { sketch_id },
        params: Some(OperationParams::Extrude(ExtrudeParams {
            boolean_mode: BooleanMode::NewBody,
            target_body_id: None,
        })),
        result_body_ids: vec![b1],
    };
    let op2 = OperationRecord {
        op_id: o2,
        op_type: OperationType::Fillet,
        input: OperationInput::BodyRef { body_id: b1 },
        params: Some(OperationParams::FilletChamfer(FilletChamferParams {
            edge_ids: vec![(b1, edge)],
        })),
        result_body_ids: vec![b1],
    };

    let mut graph = DependencyGraph::new();
    graph.rebuild_from_operations(&[op1, op2]);

    assert_eq!(graph.get_downstream(o1), vec![o2]);
    assert_eq!(graph.get_upstream(o2), vec![o1]);
    assert_eq!(graph.topological_sort(), vec![o1, o2]);
}
