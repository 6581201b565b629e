//! Snap result and type vocabulary, grounded on `SnapManager`'s `SnapType`
//! enum and `SnapResult` struct. Discriminant order doubles as priority
//! order: earlier variants win ties against later ones at equal distance.

use sketch_store::EntityId;
use waffle_types::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnapType {
    None,
    Vertex,
    Endpoint,
    Midpoint,
    Center,
    Quadrant,
    Intersection,
    OnCurve,
    Grid,
    Perpendicular,
    Tangent,
    Horizontal,
    Vertical,
    SketchGuide,
    ActiveLayer3D,
}

impl Default for SnapType {
    fn default() -> Self {
        SnapType::None
    }
}

/// A single candidate snap: the resolved position plus enough provenance to
/// act on it (materialize a coincident point, draw a guide, etc).
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub snapped: bool,
    pub snap_type: SnapType,
    pub position: Vec2,
    pub entity_id: Option<EntityId>,
    pub second_entity_id: Option<EntityId>,
    pub point_id: Option<EntityId>,
    pub distance: f64,
    pub guide_origin: Option<Vec2>,
    pub has_guide: bool,
    pub hint_text: Option<String>,
}

impl SnapResult {
    pub fn none() -> Self {
        Self {
            snapped: false,
            snap_type: SnapType::None,
            position: Vec2::ZERO,
            entity_id: None,
            second_entity_id: None,
            point_id: None,
            distance: f64::INFINITY,
            guide_origin: None,
            has_guide: false,
            hint_text: None,
        }
    }

    pub fn new(snap_type: SnapType, position: Vec2, distance: f64) -> Self {
        Self {
            snapped: true,
            snap_type,
            position,
            distance,
            ..Self::none()
        }
    }

    pub fn with_entity(mut self, id: EntityId) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn with_second_entity(mut self, id: EntityId) -> Self {
        self.second_entity_id = Some(id);
        self
    }

    pub fn with_point(mut self, id: EntityId) -> Self {
        self.point_id = Some(id);
        self
    }

    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        self.hint_text = Some(text.into());
        self
    }

    pub fn with_guide(mut self, origin: Vec2) -> Self {
        self.guide_origin = Some(origin);
        self.has_guide = true;
        self
    }

    /// True if `self` should be preferred over `other`: lower (earlier)
    /// `snap_type` wins; equal type falls back to distance.
    pub fn beats(&self, other: &SnapResult) -> bool {
        if !self.snapped {
            return false;
        }
        if !other.snapped {
            return true;
        }
        if self.snap_type != other.snap_type {
            self.snap_type < other.snap_type
        } else {
            self.distance < other.distance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_beats_grid_even_when_farther() {
        let vertex = SnapResult::new(SnapType::Vertex, Vec2::ZERO, 5.0);
        let grid = SnapResult::new(SnapType::Grid, Vec2::ZERO, 0.1);
        assert!(vertex.beats(&grid));
        assert!(!grid.beats(&vertex));
    }

    #[test]
    fn equal_type_breaks_tie_by_distance() {
        let near = SnapResult::new(SnapType::Endpoint, Vec2::ZERO, 0.1);
        let far = SnapResult::new(SnapType::Endpoint, Vec2::ZERO, 1.0);
        assert!(near.beats(&far));
    }
}
