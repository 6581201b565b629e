use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable across a document's lifetime and across rebuilds.
pub type OperationId = Uuid;
pub type SketchId = Uuid;
pub type BodyId = Uuid;
pub type FaceId = Uuid;
pub type EdgeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Extrude,
    Revolve,
    Fillet,
    Chamfer,
    Shell,
    Boolean,
}

/// Which kind of upstream geometry an operation consumes as its primary
/// input, prior to any target/tool bodies named in its params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationInput {
    SketchRegionRef { sketch_id: SketchId },
    FaceRef { body_id: BodyId, face_id: FaceId },
    BodyRef { body_id: BodyId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanMode {
    NewBody,
    Union,
    Cut,
    Intersect,
}

/// Revolve's rotation axis may itself come from a sketch line (no body
/// dependency) or from an existing solid edge (a body dependency).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RevolveAxis {
    SketchLine { sketch_id: SketchId },
    Edge { body_id: BodyId, edge_id: EdgeId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrudeParams {
    pub boolean_mode: BooleanMode,
    pub target_body_id: Option<BodyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevolveParams {
    pub boolean_mode: BooleanMode,
    pub target_body_id: Option<BodyId>,
    pub axis: RevolveAxis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilletChamferParams {
    pub edge_ids: Vec<(BodyId, EdgeId)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellParams {
    pub open_faces: Vec<(BodyId, FaceId)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooleanParams {
    pub target_body_id: BodyId,
    pub tool_body_id: BodyId,
}

/// Type-specific parameters, present for every operation type except those
/// (none currently) that need none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationParams {
    Extrude(ExtrudeParams),
    Revolve(RevolveParams),
    FilletChamfer(FilletChamferParams),
    Shell(ShellParams),
    Boolean(BooleanParams),
}

/// One entry in the operation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub op_id: OperationId,
    pub op_type: OperationType,
    pub input: OperationInput,
    pub params: Option<OperationParams>,
    pub result_body_ids: Vec<BodyId>,
}
