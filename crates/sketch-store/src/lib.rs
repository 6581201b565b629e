//! Owns and validates a single sketch's entities and constraints: the
//! mutation API, invariant enforcement, and DOF accounting.

pub mod constraint;
pub mod entity;
mod json;
mod store;

pub use constraint::{Constraint, ConstraintKind, CurvePosition};
pub use entity::{Entity, EntityKind, EntityShape};
pub use store::{HostFaceAttachment, Sketch, ValidationResult};

pub use waffle_types::{BoundingBox, ConstraintId, EntityId, Plane, Vec2};
