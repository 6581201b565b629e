//! Sketch entities: a tagged-enum sum type over point/line/arc/circle/ellipse
//! rather than a trait-object hierarchy.

use std::collections::BTreeSet;

use waffle_types::EntityId;

/// A single geometric entity owned by a [`crate::Sketch`].
///
/// Identity, the construction flag, and the reference-locked flag are common
/// to every entity kind; the kind-specific geometry lives in [`EntityShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub construction: bool,
    pub reference_locked: bool,
    pub shape: EntityShape,
}

/// The kind-specific geometry of an [`Entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntityShape {
    Point {
        x: f64,
        y: f64,
        /// Entities that reference this point as an endpoint or center.
        /// Maintained bidirectionally by the store (Invariant 4).
        connected: BTreeSet<EntityId>,
    },
    Line {
        start: EntityId,
        end: EntityId,
    },
    Arc {
        center: EntityId,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Circle {
        center: EntityId,
        radius: f64,
    },
    Ellipse {
        center: EntityId,
        major_radius: f64,
        minor_radius: f64,
        rotation: f64,
    },
}

/// Entity type tag, independent of the data it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Point,
    Line,
    Arc,
    Circle,
    Ellipse,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match &self.shape {
            EntityShape::Point { .. } => EntityKind::Point,
            EntityShape::Line { .. } => EntityKind::Line,
            EntityShape::Arc { .. } => EntityKind::Arc,
            EntityShape::Circle { .. } => EntityKind::Circle,
            EntityShape::Ellipse { .. } => EntityKind::Ellipse,
        }
    }

    /// Degrees of freedom this entity contributes before any constraint.
    pub fn dof(&self) -> u32 {
        match &self.shape {
            EntityShape::Point { .. } => 2,
            EntityShape::Line { .. } => 0,
            EntityShape::Arc { .. } => 3,
            EntityShape::Circle { .. } => 1,
            EntityShape::Ellipse { .. } => 3,
        }
    }

    /// Entity IDs this entity directly references (endpoints/center), not
    /// including itself. Used to maintain point back-pointers and to check
    /// referential integrity.
    pub fn references(&self) -> Vec<EntityId> {
        match &self.shape {
            EntityShape::Point { .. } => Vec::new(),
            EntityShape::Line { start, end } => vec![*start, *end],
            EntityShape::Arc { center, .. } => vec![*center],
            EntityShape::Circle { center, .. } => vec![*center],
            EntityShape::Ellipse { center, .. } => vec![*center],
        }
    }

    pub fn as_point(&self) -> Option<(f64, f64)> {
        match &self.shape {
            EntityShape::Point { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn connected_entities(&self) -> Option<&BTreeSet<EntityId>> {
        match &self.shape {
            EntityShape::Point { connected, .. } => Some(connected),
            _ => None,
        }
    }

    /// Swap major/minor radius and rotate by pi/2 so `major_radius >=
    /// minor_radius` is restored (Invariant 7).
    pub fn enforce_ellipse_ordering(&mut self) {
        if let EntityShape::Ellipse {
            major_radius,
            minor_radius,
            rotation,
            ..
        } = &mut self.shape
        {
            if *major_radius < *minor_radius {
                std::mem::swap(major_radius, minor_radius);
                *rotation += std::f64::consts::FRAC_PI_2;
            }
        }
    }
}
