//! Universal invariants exercised across sketch-store,
//! constraint-solver, loop-extractor, and sketch-tools together.

use approx::assert_relative_eq;
use sketch_store::{EntityKind, Sketch};
use snap_resolver::{SnapConfig, SnapResolver};
use waffle_types::Vec2;

#[test]
fn point_back_pointers_stay_bidirectional_after_mutations() {
    let mut sketch = Sketch::new();
    let a = sketch.add_point(0.0, 0.0, false);
    let b = sketch.add_point(1.0, 0.0, false);
    let line = sketch.add_line(a, b, false).unwrap();
    let circle_center = sketch.add_point(2.0, 2.0, false);
    sketch.add_circle(circle_center, 1.0, false).unwrap();

    for point_id in [a, b, circle_center] {
        let connected = sketch.get_entity(point_id).unwrap().connected_entities().unwrap().clone();
        for other in sketch.entities() {
            let should_reference = other.references().contains(&point_id);
            assert_eq!(connected.contains(&other.id), should_reference, "back-pointer mismatch for {:?} vs {:?}", point_id, other.id);
        }
    }

    sketch.remove_entity(line);
    // `a` and `b` lose their only referencing entity and are orphan-cleaned.
    assert!(sketch.get_entity(a).is_none());
    assert!(sketch.get_entity(b).is_none());
}

#[test]
fn no_constraint_references_a_missing_entity_after_cascading_removal() {
    let mut sketch = Sketch::new();
    let a = sketch.add_point(0.0, 0.0, false);
    let b = sketch.add_point(1.0, 0.0, false);
    let line = sketch.add_line(a, b, false).unwrap();
    sketch.add_horizontal(line).unwrap();

    sketch.remove_entity(line);

    for c in sketch.constraints() {
        for id in c.kind.referenced_entities() {
            assert!(sketch.get_entity(id).is_some());
        }
    }
}

#[test]
fn ellipse_major_is_never_smaller_than_minor() {
    let mut sketch = Sketch::new();
    let center = sketch.add_point(0.0, 0.0, false);
    let ellipse = sketch.add_ellipse(center, 1.0, 5.0, 0.0, false).unwrap();
    let sketch_store::EntityShape::Ellipse { major_radius, minor_radius, .. } = &sketch.get_entity(ellipse).unwrap().shape else {
        panic!("expected ellipse");
    };
    assert!(major_radius >= minor_radius);
}

#[test]
fn empty_constraint_list_solves_trivially() {
    let mut sketch = Sketch::new();
    sketch.add_point(0.0, 0.0, false);
    let result = constraint_solver::solve(&mut sketch, &constraint_solver::SolverConfig::default()).unwrap();
    assert!(result.converged);
    assert_eq!(result.iterations, 0);
}

#[test]
fn json_round_trip_preserves_entities_and_constraints() {
    let (sketch, lines) = test_harness::square_sketch(10.0);
    let mut sketch = sketch;
    sketch.add_horizontal(lines[0]);

    let json = sketch.to_json();
    let restored = Sketch::from_json(&json).expect("round-trip must parse");

    assert_eq!(restored.entities().count(), sketch.entities().count());
    assert_eq!(restored.constraints().count(), sketch.constraints().count());
    for kind in [EntityKind::Point, EntityKind::Line] {
        assert_eq!(
            restored.entities().filter(|e| e.kind() == kind).count(),
            sketch.entities().filter(|e| e.kind() == kind).count(),
        );
    }
}

#[test]
fn repeated_snap_resolution_is_deterministic() {
    let (sketch, _) = test_harness::square_sketch(10.0);
    let mut resolver = SnapResolver::new(SnapConfig::default());
    let cursor = Vec2::new(5.1, 0.2);

    let first = resolver.find_best_snap(&sketch, cursor);
    for _ in 0..19 {
        let again = resolver.find_best_snap(&sketch, cursor);
        assert_eq!(again.snap_type, first.snap_type);
        assert_relative_eq!(again.position.x, first.position.x, epsilon = 1e-12);
        assert_relative_eq!(again.position.y, first.position.y, epsilon = 1e-12);
    }
}
