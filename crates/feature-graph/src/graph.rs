//! Directed-acyclic operation graph, grounded on `DependencyGraph.cpp`:
//! nodes are operations, edges run producer -> consumer over shared bodies.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::types::{
    BodyId, EdgeId, FaceId, OperationId, OperationInput, OperationParams, OperationRecord,
    OperationType, SketchId,
};

/// One operation's place in the graph: its declared inputs (for audit) and
/// its outputs (for producer bookkeeping), plus suppression/failure state.
#[derive(Debug, Clone)]
pub struct FeatureNode {
    pub op_id: OperationId,
    pub op_type: OperationType,
    pub input_sketch_ids: HashSet<SketchId>,
    pub input_body_ids: HashSet<BodyId>,
    pub input_face_ids: HashSet<FaceId>,
    pub input_edge_ids: HashSet<EdgeId>,
    pub output_body_ids: HashSet<BodyId>,
    pub suppressed: bool,
    pub failed: bool,
    pub failure_reason: String,
}

impl FeatureNode {
    fn new(op: &OperationRecord) -> Self {
        Self {
            op_id: op.op_id,
            op_type: op.op_type,
            input_sketch_ids: HashSet::new(),
            input_body_ids: HashSet::new(),
            input_face_ids: HashSet::new(),
            input_edge_ids: HashSet::new(),
            output_body_ids: op.result_body_ids.iter().copied().collect(),
            suppressed: false,
            failed: false,
            failure_reason: String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<OperationId, FeatureNode>,
    forward_edges: HashMap<OperationId, HashSet<OperationId>>,
    backward_edges: HashMap<OperationId, HashSet<OperationId>>,
    creation_order: Vec<OperationId>,
    body_producers: HashMap<BodyId, OperationId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.forward_edges.clear();
        self.backward_edges.clear();
        self.creation_order.clear();
        self.body_producers.clear();
    }

    pub fn rebuild_from_operations(&mut self, ops: &[OperationRecord]) {
        debug!(operation_count = ops.len(), "rebuild_from_operations:start");
        self.clear();
        for op in ops {
            let mut node = FeatureNode::new(op);
            extract_dependencies(op, &mut node);
            self.nodes.insert(op.op_id, node);
            self.creation_order.push(op.op_id);
        }
        self.rebuild_edges();
        debug!(
            node_count = self.nodes.len(),
            forward_edge_count = self.forward_edges.len(),
            backward_edge_count = self.backward_edges.len(),
            "rebuild_from_operations:done"
        );
    }

    pub fn add_operation(&mut self, op: &OperationRecord) {
        debug!(op_id = %op.op_id, outputs = op.result_body_ids.len(), "add_operation");
        let mut node = FeatureNode::new(op);
        extract_dependencies(op, &mut node);
        self.nodes.insert(op.op_id, node);
        self.creation_order.push(op.op_id);
        self.rebuild_edges();
    }

    pub fn remove_operation(&mut self, op_id: OperationId) {
        let Some(node) = self.nodes.remove(&op_id) else {
            return;
        };
        for body_id in &node.output_body_ids {
            self.body_producers.remove(body_id);
        }
        self.creation_order.retain(|id| *id != op_id);
        self.rebuild_edges();
    }

    pub fn get_node(&self, op_id: OperationId) -> Option<&FeatureNode> {
        self.nodes.get(&op_id)
    }

    pub fn get_node_mut(&mut self, op_id: OperationId) -> Option<&mut FeatureNode> {
        self.nodes.get_mut(&op_id)
    }

    /// Kahn's algorithm with a creation-order tie-break; an empty result on
    /// a non-empty graph indicates a cycle.
    pub fn topological_sort(&self) -> Vec<OperationId> {
        let creation_index: HashMap<OperationId, usize> =
            self.creation_order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut in_degree: HashMap<OperationId, usize> =
            self.nodes.keys().map(|id| (*id, 0)).collect();
        for (op_id, upstreams) in &self.backward_edges {
            in_degree.insert(*op_id, upstreams.len());
        }

        let index_of = |id: &OperationId| creation_index.get(id).copied().unwrap_or(self.creation_order.len());

        let mut queue: BinaryHeap<Reverse<(usize, OperationId)>> = BinaryHeap::new();
        for (op_id, degree) in &in_degree {
            if *degree == 0 {
                queue.push(Reverse((index_of(op_id), *op_id)));
            }
        }

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, current))) = queue.pop() {
            result.push(current);
            if let Some(downstreams) = self.forward_edges.get(&current) {
                for downstream in downstreams {
                    let degree = in_degree.get_mut(downstream).expect("downstream node must be tracked");
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(Reverse((index_of(downstream), *downstream)));
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            return Vec::new();
        }
        result
    }

    pub fn get_downstream(&self, op_id: OperationId) -> Vec<OperationId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.collect_downstream(op_id, &mut visited, &mut result);
        result
    }

    pub fn get_upstream(&self, op_id: OperationId) -> Vec<OperationId> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.collect_upstream(op_id, &mut visited, &mut result);
        result
    }

    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_empty() && !self.nodes.is_empty()
    }

    pub fn set_suppressed(&mut self, op_id: OperationId, suppressed: bool) {
        if let Some(node) = self.nodes.get_mut(&op_id) {
            node.suppressed = suppressed;
        }
    }

    pub fn is_suppressed(&self, op_id: OperationId) -> bool {
        self.nodes.get(&op_id).map(|n| n.suppressed).unwrap_or(false)
    }

    /// Suppressing an operation additionally suppresses its downstream
    /// closure.
    pub fn suppress_downstream(&mut self, op_id: OperationId) {
        for downstream in self.get_downstream(op_id) {
            self.set_suppressed(downstream, true);
        }
    }

    pub fn suppression_state(&self) -> HashMap<OperationId, bool> {
        self.nodes.iter().map(|(id, n)| (*id, n.suppressed)).collect()
    }

    pub fn set_suppression_state(&mut self, state: &HashMap<OperationId, bool>) {
        for (op_id, suppressed) in state {
            self.set_suppressed(*op_id, *suppressed);
        }
    }

    pub fn set_failed(&mut self, op_id: OperationId, failed: bool, reason: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&op_id) {
            node.failed = failed;
            node.failure_reason = reason.into();
        }
    }

    pub fn is_failed(&self, op_id: OperationId) -> bool {
        self.nodes.get(&op_id).map(|n| n.failed).unwrap_or(false)
    }

    pub fn failure_reason(&self, op_id: OperationId) -> Option<&str> {
        self.nodes.get(&op_id).map(|n| n.failure_reason.as_str())
    }

    pub fn failed_ops(&self) -> Vec<OperationId> {
        self.nodes.iter().filter(|(_, n)| n.failed).map(|(id, _)| *id).collect()
    }

    pub fn clear_failures(&mut self) {
        for node in self.nodes.values_mut() {
            node.failed = false;
            node.failure_reason.clear();
        }
    }

    /// Walks creation order so each consumed body resolves to its most
    /// recent producer.
    fn rebuild_edges(&mut self) {
        self.forward_edges.clear();
        self.backward_edges.clear();
        self.body_producers.clear();

        for op_id in self.creation_order.clone() {
            let Some(node) = self.nodes.get(&op_id) else {
                continue;
            };

            for input_body_id in node.input_body_ids.clone() {
                if let Some(producer) = self.body_producers.get(&input_body_id).copied() {
                    if producer != op_id {
                        self.forward_edges.entry(producer).or_default().insert(op_id);
                        self.backward_edges.entry(op_id).or_default().insert(producer);
                    }
                }
            }

            for body_id in node.output_body_ids.clone() {
                self.body_producers.insert(body_id, op_id);
            }
        }
    }

    fn collect_downstream(&self, op_id: OperationId, visited: &mut HashSet<OperationId>, result: &mut Vec<OperationId>) {
        let Some(downstreams) = self.forward_edges.get(&op_id) else {
            return;
        };
        for downstream in downstreams {
            if visited.insert(*downstream) {
                result.push(*downstream);
                self.collect_downstream(*downstream, visited, result);
            }
        }
    }

    fn collect_upstream(&self, op_id: OperationId, visited: &mut HashSet<OperationId>, result: &mut Vec<OperationId>) {
        let Some(upstreams) = self.backward_edges.get(&op_id) else {
            return;
        };
        for upstream in upstreams {
            if visited.insert(*upstream) {
                result.push(*upstream);
                self.collect_upstream(*upstream, visited, result);
            }
        }
    }
}

fn extract_dependencies(op: &OperationRecord, node: &mut FeatureNode) {
    match &op.input {
        OperationInput::SketchRegionRef { sketch_id } => {
            node.input_sketch_ids.insert(*sketch_id);
        }
        OperationInput::FaceRef { body_id, face_id } => {
            node.input_body_ids.insert(*body_id);
            node.input_face_ids.insert(*face_id);
        }
        OperationInput::BodyRef { body_id } => {
            node.input_body_ids.insert(*body_id);
        }
    }

    match &op.params {
        Some(OperationParams::Extrude(p)) => {
            if p.boolean_mode != crate::types::BooleanMode::NewBody {
                if let Some(target) = p.target_body_id {
                    node.input_body_ids.insert(target);
                    debug!(op_id = %op.op_id, target_body_id = %target, mode = ?p.boolean_mode, "extract_dependencies:extrude-target-body");
                }
            }
        }
        Some(OperationParams::Revolve(p)) => {
            if p.boolean_mode != crate::types::BooleanMode::NewBody {
                if let Some(target) = p.target_body_id {
                    node.input_body_ids.insert(target);
                    debug!(op_id = %op.op_id, target_body_id = %target, mode = ?p.boolean_mode, "extract_dependencies:revolve-target-body");
                }
            }
            match &p.axis {
                crate::types::RevolveAxis::SketchLine { sketch_id } => {
                    node.input_sketch_ids.insert(*sketch_id);
                }
                crate::types::RevolveAxis::Edge { body_id, edge_id } => {
                    node.input_body_ids.insert(*body_id);
                    node.input_edge_ids.insert(*edge_id);
                }
            }
        }
        Some(OperationParams::FilletChamfer(p)) => {
            for (body_id, edge_id) in &p.edge_ids {
                node.input_body_ids.insert(*body_id);
                node.input_edge_ids.insert(*edge_id);
            }
        }
        Some(OperationParams::Shell(p)) => {
            for (body_id, face_id) in &p.open_faces {
                node.input_body_ids.insert(*body_id);
                node.input_face_ids.insert(*face_id);
            }
        }
        Some(OperationParams::Boolean(p)) => {
            node.input_body_ids.insert(p.target_body_id);
            node.input_body_ids.insert(p.tool_body_id);
        }
        None => {}
    }
}
