//! Sketch constraints: the closed, tagged-enum variant set the solver walks
//! to emit residuals.

use waffle_types::{ConstraintId, EntityId};

/// Where a `PointOnCurve` constraint's point is pinned relative to an arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurvePosition {
    Start,
    End,
    Arbitrary,
}

/// A constraint between sketch entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
}

/// The variant set of constraint kinds. Non-dimensional variants enforce a
/// geometric relationship with no adjustable scalar; dimensional variants
/// carry a `value` the UI can edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    Coincident { point_a: EntityId, point_b: EntityId },
    Horizontal { line: EntityId },
    Vertical { line: EntityId },
    Parallel { line_a: EntityId, line_b: EntityId },
    Perpendicular { line_a: EntityId, line_b: EntityId },
    Tangent { entity_a: EntityId, entity_b: EntityId },
    Equal { entity_a: EntityId, entity_b: EntityId },
    Concentric { entity_a: EntityId, entity_b: EntityId },
    PointOnCurve {
        point: EntityId,
        curve: EntityId,
        position: CurvePosition,
    },
    Fixed { point: EntityId, x: f64, y: f64 },
    Distance { point_a: EntityId, point_b: EntityId, value: f64 },
    Radius { curve: EntityId, value: f64 },
    Diameter { curve: EntityId, value: f64 },
    Angle { line_a: EntityId, line_b: EntityId, value: f64 },
}

impl ConstraintKind {
    /// Sorted, deduplicated list of entities this constraint references.
    pub fn referenced_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = match self {
            ConstraintKind::Coincident { point_a, point_b } => vec![*point_a, *point_b],
            ConstraintKind::Horizontal { line } => vec![*line],
            ConstraintKind::Vertical { line } => vec![*line],
            ConstraintKind::Parallel { line_a, line_b } => vec![*line_a, *line_b],
            ConstraintKind::Perpendicular { line_a, line_b } => vec![*line_a, *line_b],
            ConstraintKind::Tangent { entity_a, entity_b } => vec![*entity_a, *entity_b],
            ConstraintKind::Equal { entity_a, entity_b } => vec![*entity_a, *entity_b],
            ConstraintKind::Concentric { entity_a, entity_b } => vec![*entity_a, *entity_b],
            ConstraintKind::PointOnCurve { point, curve, .. } => vec![*point, *curve],
            ConstraintKind::Fixed { point, .. } => vec![*point],
            ConstraintKind::Distance { point_a, point_b, .. } => vec![*point_a, *point_b],
            ConstraintKind::Radius { curve, .. } => vec![*curve],
            ConstraintKind::Diameter { curve, .. } => vec![*curve],
            ConstraintKind::Angle { line_a, line_b, .. } => vec![*line_a, *line_b],
        };
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// True if this constraint kind may legally target a reference-locked
    /// entity (Invariant 2: only `Fixed` may).
    pub fn allows_locked_targets(&self) -> bool {
        matches!(self, ConstraintKind::Fixed { .. })
    }

    /// Degrees of freedom removed by this constraint (1, 2, or 3).
    pub fn dof_removed(&self) -> u32 {
        match self {
            ConstraintKind::Coincident { .. } => 2,
            ConstraintKind::Horizontal { .. } => 1,
            ConstraintKind::Vertical { .. } => 1,
            ConstraintKind::Parallel { .. } => 1,
            ConstraintKind::Perpendicular { .. } => 1,
            ConstraintKind::Tangent { .. } => 1,
            ConstraintKind::Equal { .. } => 1,
            ConstraintKind::Concentric { .. } => 2,
            ConstraintKind::PointOnCurve { .. } => 1,
            ConstraintKind::Fixed { .. } => 2,
            ConstraintKind::Distance { .. } => 1,
            ConstraintKind::Radius { .. } => 1,
            ConstraintKind::Diameter { .. } => 1,
            ConstraintKind::Angle { .. } => 1,
        }
    }

    /// True for the four dimensional constraint kinds that carry a
    /// UI-editable scalar `value`.
    pub fn is_dimensional(&self) -> bool {
        matches!(
            self,
            ConstraintKind::Distance { .. }
                | ConstraintKind::Radius { .. }
                | ConstraintKind::Diameter { .. }
                | ConstraintKind::Angle { .. }
        )
    }
}

impl Constraint {
    pub fn referenced_entities(&self) -> Vec<EntityId> {
        self.kind.referenced_entities()
    }

    pub fn dof_removed(&self) -> u32 {
        self.kind.dof_removed()
    }
}
