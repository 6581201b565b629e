//! Output types for loop/face extraction, grounded on `LoopDetector.h`'s
//! `Wire`/`Loop`/`Face`/`LoopDetectionResult`.

use sketch_store::EntityId;
use waffle_types::Vec2;

/// An ordered sequence of connected edges. `points` is the walk's node
/// positions (closed wires repeat the start point as the last entry);
/// `entity_ids` is the corresponding edge list in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub entity_ids: Vec<EntityId>,
    pub points: Vec<Vec2>,
    pub signed_area: f64,
}

impl Wire {
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 2
            && self.points.first().unwrap().distance(*self.points.last().unwrap()) < 1e-6
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area > 0.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point_in_polygon(point, &self.points)
    }
}

/// An outer loop plus zero or more hole loops.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub outer: Wire,
    pub holes: Vec<Wire>,
}

impl Face {
    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(Wire::area).sum::<f64>()
    }

    /// A point is inside the face if it is inside the outer loop and inside
    /// none of the holes.
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.outer.contains_point(point) && !self.holes.iter().any(|h| h.contains_point(point))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopDetectionResult {
    pub faces: Vec<Face>,
    pub open_wires: Vec<Wire>,
    pub isolated_points: Vec<EntityId>,
    pub unused_edges: Vec<EntityId>,
    pub success: bool,
    pub error: Option<String>,
    pub total_loops_found: usize,
    pub faces_with_holes: usize,
}

#[derive(Debug, Clone)]
pub struct LoopDetectorConfig {
    pub coincidence_tolerance: f64,
    pub find_all_loops: bool,
    pub compute_areas: bool,
    pub resolve_holes: bool,
    pub max_loops: usize,
    pub validate: bool,
    pub planarize_intersections: bool,
    pub degenerate_area_epsilon: f64,
    pub arc_segments_per_full_turn: usize,
    pub circle_segments: usize,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            coincidence_tolerance: 1e-4,
            find_all_loops: false,
            compute_areas: true,
            resolve_holes: true,
            max_loops: 0,
            validate: true,
            planarize_intersections: true,
            degenerate_area_epsilon: 1e-6,
            arc_segments_per_full_turn: 32,
            circle_segments: 32,
        }
    }
}

/// Standard ray-casting point-in-polygon test (boundary is treated as
/// outside, matching the original's `contains` semantics for area-based
/// nesting).
pub(crate) fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let n = polygon.len();
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_intersect = pj.x + (point.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if point.x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
