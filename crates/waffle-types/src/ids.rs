//! Identifier types shared by the sketch and feature layers.

/// Identifier for a sketch entity. Stable for the entity's lifetime,
/// unique within its owning sketch, dispensed in monotonically increasing
/// creation order.
pub type EntityId = u64;

/// Identifier for a sketch constraint. Same lifetime/uniqueness rules as
/// [`EntityId`], but drawn from a separate namespace.
pub type ConstraintId = u64;
