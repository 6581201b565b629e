//! Operation dependency graph: a DAG over operation
//! records, grounded on `app/history/DependencyGraph.cpp`. Edges run from
//! the operation that produced a body to every later operation consuming
//! it; offers topological order, up/downstream closure, cycle detection,
//! and suppression/failure propagation.

mod graph;
mod types;

pub use graph::{DependencyGraph, FeatureNode};
pub use types::{
    BodyId, BooleanMode, BooleanParams, EdgeId, ExtrudeParams, FaceId, FilletChamferParams,
    OperationId, OperationInput, OperationParams, OperationRecord, OperationType, RevolveAxis,
    RevolveParams, ShellParams, SketchId,
};

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn extrude(op_id: OperationId, sketch_id: SketchId, body_out: BodyId) -> OperationRecord {
        OperationRecord {
            op_id,
            op_type: OperationType::Extrude,
            input: OperationInput::SketchRegionRef { sketch_id },
            params: Some(OperationParams::Extrude(ExtrudeParams {
                boolean_mode: BooleanMode::NewBody,
                target_body_id: None,
            })),
            result_body_ids: vec![body_out],
        }
    }

    fn fillet(op_id: OperationId, body_id: BodyId, edge_id: EdgeId) -> OperationRecord {
        OperationRecord {
            op_id,
            op_type: OperationType::Fillet,
            input: OperationInput::BodyRef { body_id },
            params: Some(OperationParams::FilletChamfer(FilletChamferParams {
                edge_ids: vec![(body_id, edge_id)],
            })),
            result_body_ids: vec![body_id],
        }
    }

    #[test]
    fn dependency_edge_scenario() {
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let sketch = Uuid::new_v4();
        let b1 = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let ops = vec![extrude(o1, sketch, b1), fillet(o2, b1, edge)];

        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);

        assert_eq!(graph.get_downstream(o1), vec![o2]);
        assert_eq!(graph.get_upstream(o2), vec![o1]);
        assert_eq!(graph.topological_sort(), vec![o1, o2]);
    }

    #[test]
    fn topological_sort_ties_break_on_creation_order() {
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let sketch_a = Uuid::new_v4();
        let sketch_b = Uuid::new_v4();
        let body_a = Uuid::new_v4();
        let body_b = Uuid::new_v4();

        // Two independent extrudes, no shared body: both are sources, order
        // should follow creation order exactly.
        let ops = vec![extrude(o1, sketch_a, body_a), extrude(o2, sketch_b, body_b)];
        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);

        assert_eq!(graph.topological_sort(), vec![o1, o2]);
    }

    #[test]
    fn normal_histories_never_have_a_cycle() {
        // Producer/consumer edges only ever run from an earlier-created
        // operation to a later one, so a history built through
        // `rebuild_from_operations` can never actually cycle; this just
        // pins that `has_cycle` reports false rather than false-positiving.
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let sketch = Uuid::new_v4();
        let b1 = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let ops = vec![extrude(o1, sketch, b1), fillet(o2, b1, edge)];
        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);

        assert!(!graph.has_cycle());
    }

    #[test]
    fn a_later_producer_of_the_same_body_supersedes_the_earlier_one() {
        // o1 and o2 both (re-)produce body b1; o3 consumes it and should
        // depend on o2 (the most recent producer), not o1.
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let o3 = Uuid::new_v4();
        let b1 = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let op1 = extrude(o1, Uuid::new_v4(), b1);
        let op2 = fillet(o2, b1, edge); // re-produces b1
        let op3 = fillet(o3, b1, edge);

        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&[op1, op2, op3]);

        assert_eq!(graph.get_upstream(o3), vec![o2]);
    }

    #[test]
    fn suppressing_an_operation_suppresses_its_downstream_closure() {
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let o3 = Uuid::new_v4();
        let sketch = Uuid::new_v4();
        let b1 = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let ops = vec![extrude(o1, sketch, b1), fillet(o2, b1, edge), fillet(o3, b1, edge)];
        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);

        graph.suppress_downstream(o1);
        assert!(graph.is_suppressed(o2));
        assert!(graph.is_suppressed(o3));
        assert!(!graph.is_suppressed(o1));
    }

    #[test]
    fn failure_state_round_trips() {
        let o1 = Uuid::new_v4();
        let ops = vec![extrude(o1, Uuid::new_v4(), Uuid::new_v4())];
        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);

        graph.set_failed(o1, true, "kernel evaluation failed");
        assert!(graph.is_failed(o1));
        assert_eq!(graph.failure_reason(o1), Some("kernel evaluation failed"));
        assert_eq!(graph.failed_ops(), vec![o1]);

        graph.clear_failures();
        assert!(!graph.is_failed(o1));
    }

    #[test]
    fn remove_operation_drops_its_edges() {
        let o1 = Uuid::new_v4();
        let o2 = Uuid::new_v4();
        let sketch = Uuid::new_v4();
        let b1 = Uuid::new_v4();
        let edge = Uuid::new_v4();

        let ops = vec![extrude(o1, sketch, b1), fillet(o2, b1, edge)];
        let mut graph = DependencyGraph::new();
        graph.rebuild_from_operations(&ops);
        assert_eq!(graph.get_downstream(o1), vec![o2]);

        graph.remove_operation(o1);
        assert!(graph.get_node(o1).is_none());
        assert!(graph.get_downstream(o2).is_empty());
    }
}
