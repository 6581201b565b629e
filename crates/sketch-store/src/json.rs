//! The sketch wire format: a flat, internally-tagged JSON
//! representation distinct from the in-memory `Entity`/`Constraint` shapes.
//! `Sketch::to_json`/`from_json` live here; `from_json` validates as a whole
//! and returns `None` rather than handing back a partially-built sketch.

use serde::{Deserialize, Serialize};

use waffle_types::{ConstraintId, EntityId, Plane};

use crate::constraint::{Constraint, ConstraintKind, CurvePosition};
use crate::entity::{Entity, EntityShape};
use crate::store::Sketch;

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum EntityWire {
    Point {
        id: EntityId,
        x: f64,
        y: f64,
        construction: bool,
        reference_locked: bool,
    },
    Line {
        id: EntityId,
        start: EntityId,
        end: EntityId,
        construction: bool,
        reference_locked: bool,
    },
    Arc {
        id: EntityId,
        center: EntityId,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        construction: bool,
        reference_locked: bool,
    },
    Circle {
        id: EntityId,
        center: EntityId,
        radius: f64,
        construction: bool,
        reference_locked: bool,
    },
    Ellipse {
        id: EntityId,
        center: EntityId,
        major_radius: f64,
        minor_radius: f64,
        rotation: f64,
        construction: bool,
        reference_locked: bool,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum CurvePositionWire {
    Start,
    End,
    Arbitrary,
}

impl From<CurvePosition> for CurvePositionWire {
    fn from(p: CurvePosition) -> Self {
        match p {
            CurvePosition::Start => CurvePositionWire::Start,
            CurvePosition::End => CurvePositionWire::End,
            CurvePosition::Arbitrary => CurvePositionWire::Arbitrary,
        }
    }
}

impl From<CurvePositionWire> for CurvePosition {
    fn from(p: CurvePositionWire) -> Self {
        match p {
            CurvePositionWire::Start => CurvePosition::Start,
            CurvePositionWire::End => CurvePosition::End,
            CurvePositionWire::Arbitrary => CurvePosition::Arbitrary,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ConstraintWire {
    Coincident { id: ConstraintId, point_a: EntityId, point_b: EntityId },
    Horizontal { id: ConstraintId, line: EntityId },
    Vertical { id: ConstraintId, line: EntityId },
    Parallel { id: ConstraintId, line_a: EntityId, line_b: EntityId },
    Perpendicular { id: ConstraintId, line_a: EntityId, line_b: EntityId },
    Tangent { id: ConstraintId, entity_a: EntityId, entity_b: EntityId },
    Equal { id: ConstraintId, entity_a: EntityId, entity_b: EntityId },
    Concentric { id: ConstraintId, entity_a: EntityId, entity_b: EntityId },
    PointOnCurve {
        id: ConstraintId,
        point: EntityId,
        curve: EntityId,
        position: CurvePositionWire,
    },
    Fixed { id: ConstraintId, point: EntityId, x: f64, y: f64 },
    Distance { id: ConstraintId, point_a: EntityId, point_b: EntityId, value: f64 },
    Radius { id: ConstraintId, curve: EntityId, value: f64 },
    Diameter { id: ConstraintId, curve: EntityId, value: f64 },
    Angle { id: ConstraintId, line_a: EntityId, line_b: EntityId, value: f64 },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SketchWire {
    id: uuid::Uuid,
    plane: Plane,
    entities: Vec<EntityWire>,
    constraints: Vec<ConstraintWire>,
}

fn entity_to_wire(e: &Entity) -> EntityWire {
    match &e.shape {
        EntityShape::Point { x, y, .. } => EntityWire::Point {
            id: e.id,
            x: *x,
            y: *y,
            construction: e.construction,
            reference_locked: e.reference_locked,
        },
        EntityShape::Line { start, end } => EntityWire::Line {
            id: e.id,
            start: *start,
            end: *end,
            construction: e.construction,
            reference_locked: e.reference_locked,
        },
        EntityShape::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => EntityWire::Arc {
            id: e.id,
            center: *center,
            radius: *radius,
            start_angle: *start_angle,
            end_angle: *end_angle,
            construction: e.construction,
            reference_locked: e.reference_locked,
        },
        EntityShape::Circle { center, radius } => EntityWire::Circle {
            id: e.id,
            center: *center,
            radius: *radius,
            construction: e.construction,
            reference_locked: e.reference_locked,
        },
        EntityShape::Ellipse {
            center,
            major_radius,
            minor_radius,
            rotation,
        } => EntityWire::Ellipse {
            id: e.id,
            center: *center,
            major_radius: *major_radius,
            minor_radius: *minor_radius,
            rotation: *rotation,
            construction: e.construction,
            reference_locked: e.reference_locked,
        },
    }
}

/// Builds a bare entity with no back-pointers populated yet; the caller
/// reconstructs `connected` sets from the full entity list afterward.
fn entity_from_wire(w: EntityWire) -> Entity {
    match w {
        EntityWire::Point {
            id,
            x,
            y,
            construction,
            reference_locked,
        } => Entity {
            id,
            construction,
            reference_locked,
            shape: EntityShape::Point {
                x,
                y,
                connected: std::collections::BTreeSet::new(),
            },
        },
        EntityWire::Line {
            id,
            start,
            end,
            construction,
            reference_locked,
        } => Entity {
            id,
            construction,
            reference_locked,
            shape: EntityShape::Line { start, end },
        },
        EntityWire::Arc {
            id,
            center,
            radius,
            start_angle,
            end_angle,
            construction,
            reference_locked,
        } => Entity {
            id,
            construction,
            reference_locked,
            shape: EntityShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            },
        },
        EntityWire::Circle {
            id,
            center,
            radius,
            construction,
            reference_locked,
        } => Entity {
            id,
            construction,
            reference_locked,
            shape: EntityShape::Circle { center, radius },
        },
        EntityWire::Ellipse {
            id,
            center,
            major_radius,
            minor_radius,
            rotation,
            construction,
            reference_locked,
        } => Entity {
            id,
            construction,
            reference_locked,
            shape: EntityShape::Ellipse {
                center,
                major_radius,
                minor_radius,
                rotation,
            },
        },
    }
}

fn constraint_to_wire(c: &Constraint) -> ConstraintWire {
    let id = c.id;
    match c.kind.clone() {
        ConstraintKind::Coincident { point_a, point_b } => ConstraintWire::Coincident { id, point_a, point_b },
        ConstraintKind::Horizontal { line } => ConstraintWire::Horizontal { id, line },
        ConstraintKind::Vertical { line } => ConstraintWire::Vertical { id, line },
        ConstraintKind::Parallel { line_a, line_b } => ConstraintWire::Parallel { id, line_a, line_b },
        ConstraintKind::Perpendicular { line_a, line_b } => ConstraintWire::Perpendicular { id, line_a, line_b },
        ConstraintKind::Tangent { entity_a, entity_b } => ConstraintWire::Tangent { id, entity_a, entity_b },
        ConstraintKind::Equal { entity_a, entity_b } => ConstraintWire::Equal { id, entity_a, entity_b },
        ConstraintKind::Concentric { entity_a, entity_b } => ConstraintWire::Concentric { id, entity_a, entity_b },
        ConstraintKind::PointOnCurve { point, curve, position } => ConstraintWire::PointOnCurve {
            id,
            point,
            curve,
            position: position.into(),
        },
        ConstraintKind::Fixed { point, x, y } => ConstraintWire::Fixed { id, point, x, y },
        ConstraintKind::Distance { point_a, point_b, value } => ConstraintWire::Distance {
            id,
            point_a,
            point_b,
            value,
        },
        ConstraintKind::Radius { curve, value } => ConstraintWire::Radius { id, curve, value },
        ConstraintKind::Diameter { curve, value } => ConstraintWire::Diameter { id, curve, value },
        ConstraintKind::Angle { line_a, line_b, value } => ConstraintWire::Angle { id, line_a, line_b, value },
    }
}

fn constraint_from_wire(w: ConstraintWire) -> Constraint {
    let (id, kind) = match w {
        ConstraintWire::Coincident { id, point_a, point_b } => (id, ConstraintKind::Coincident { point_a, point_b }),
        ConstraintWire::Horizontal { id, line } => (id, ConstraintKind::Horizontal { line }),
        ConstraintWire::Vertical { id, line } => (id, ConstraintKind::Vertical { line }),
        ConstraintWire::Parallel { id, line_a, line_b } => (id, ConstraintKind::Parallel { line_a, line_b }),
        ConstraintWire::Perpendicular { id, line_a, line_b } => {
            (id, ConstraintKind::Perpendicular { line_a, line_b })
        }
        ConstraintWire::Tangent { id, entity_a, entity_b } => (id, ConstraintKind::Tangent { entity_a, entity_b }),
        ConstraintWire::Equal { id, entity_a, entity_b } => (id, ConstraintKind::Equal { entity_a, entity_b }),
        ConstraintWire::Concentric { id, entity_a, entity_b } => {
            (id, ConstraintKind::Concentric { entity_a, entity_b })
        }
        ConstraintWire::PointOnCurve {
            id,
            point,
            curve,
            position,
        } => (
            id,
            ConstraintKind::PointOnCurve {
                point,
                curve,
                position: position.into(),
            },
        ),
        ConstraintWire::Fixed { id, point, x, y } => (id, ConstraintKind::Fixed { point, x, y }),
        ConstraintWire::Distance { id, point_a, point_b, value } => {
            (id, ConstraintKind::Distance { point_a, point_b, value })
        }
        ConstraintWire::Radius { id, curve, value } => (id, ConstraintKind::Radius { curve, value }),
        ConstraintWire::Diameter { id, curve, value } => (id, ConstraintKind::Diameter { curve, value }),
        ConstraintWire::Angle { id, line_a, line_b, value } => {
            (id, ConstraintKind::Angle { line_a, line_b, value })
        }
    };
    Constraint { id, kind }
}

impl Sketch {
    pub fn to_json(&self) -> String {
        let wire = SketchWire {
            id: self.id,
            plane: self.plane,
            entities: self.entities().map(entity_to_wire).collect(),
            constraints: self.constraints().map(constraint_to_wire).collect(),
        };
        serde_json::to_string(&wire).expect("sketch wire format is always serializable")
    }

    /// Parses and validates `json` as a whole. Returns `None` on any
    /// malformed element, dangling reference, or duplicate ID rather than a
    /// partially-reconstructed sketch.
    pub fn from_json(json: &str) -> Option<Sketch> {
        let wire: SketchWire = serde_json::from_str(json).ok()?;

        let mut sketch = Sketch {
            id: wire.id,
            plane: wire.plane,
            host_face: None,
            entities: Vec::new(),
            entity_index: std::collections::HashMap::new(),
            constraints: Vec::new(),
            constraint_index: std::collections::HashMap::new(),
            next_entity_id: 1,
            next_constraint_id: 1,
            dof_cache: None,
            dirty: true,
        };

        let mut max_entity_id = 0;
        for wire_entity in wire.entities {
            let entity = entity_from_wire(wire_entity);
            if sketch.entity_index.contains_key(&entity.id) {
                return None;
            }
            max_entity_id = max_entity_id.max(entity.id);
            sketch.entity_index.insert(entity.id, sketch.entities.len());
            sketch.entities.push(entity);
        }
        sketch.next_entity_id = max_entity_id + 1;

        // referential integrity: every entity reference must resolve to a point
        for entity in &sketch.entities {
            for referenced_id in entity.references() {
                match sketch.entity_index.get(&referenced_id) {
                    Some(&idx) if matches!(sketch.entities[idx].shape, EntityShape::Point { .. }) => {}
                    _ => return None,
                }
            }
        }

        // rebuild point back-pointers from scratch
        let links: Vec<(EntityId, EntityId)> = sketch
            .entities
            .iter()
            .flat_map(|e| e.references().into_iter().map(move |r| (r, e.id)))
            .collect();
        for (point_id, dependent_id) in links {
            if let Some(&idx) = sketch.entity_index.get(&point_id) {
                if let EntityShape::Point { connected, .. } = &mut sketch.entities[idx].shape {
                    connected.insert(dependent_id);
                }
            }
        }

        let mut max_constraint_id = 0;
        for wire_constraint in wire.constraints {
            let constraint = constraint_from_wire(wire_constraint);
            if sketch.constraint_index.contains_key(&constraint.id) {
                return None;
            }
            if !constraint
                .referenced_entities()
                .iter()
                .all(|id| sketch.entity_index.contains_key(id))
            {
                return None;
            }
            max_constraint_id = max_constraint_id.max(constraint.id);
            sketch.constraint_index.insert(constraint.id, sketch.constraints.len());
            sketch.constraints.push(constraint);
        }
        sketch.next_constraint_id = max_constraint_id + 1;

        if !sketch.validate().is_valid() {
            return None;
        }

        Some(sketch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_constrained_square() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(1.0, 0.0, false);
        let line = sketch.add_line(p0, p1, false).unwrap();
        sketch.add_horizontal(line);
        let json = sketch.to_json();
        let restored = Sketch::from_json(&json).expect("valid json round-trips");
        assert_eq!(restored.entities().count(), sketch.entities().count());
        assert_eq!(restored.constraints().count(), sketch.constraints().count());
    }

    #[test]
    fn rejects_dangling_reference() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "plane": {"origin":[0,0,0],"xAxis":[1,0,0],"yAxis":[0,1,0],"normal":[0,0,1]},
            "entities": [{"type":"line","id":1,"start":9,"end":10,"construction":false,"referenceLocked":false}],
            "constraints": []
        }"#;
        assert!(Sketch::from_json(json).is_none());
    }
}
