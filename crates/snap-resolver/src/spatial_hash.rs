//! A uniform grid over sketch points, rebuilt lazily when the entity count
//! changes. Accelerates the vertex/endpoint/center/quadrant candidate scans
//! by limiting them to the cells around the cursor instead of every entity.

use std::collections::HashMap;

use sketch_store::{EntityId, Sketch};
use waffle_types::Vec2;

type Cell = (i64, i64);

#[derive(Debug, Default)]
pub(crate) struct SpatialHash {
    cell_size: f64,
    buckets: HashMap<Cell, Vec<(EntityId, Vec2)>>,
    built_for_entity_count: usize,
}

impl SpatialHash {
    pub(crate) fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-6),
            buckets: HashMap::new(),
            built_for_entity_count: usize::MAX,
        }
    }

    fn cell_of(&self, p: Vec2) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    /// Rebuilds from every point in the sketch if the entity count changed
    /// since the last build. Entity count is a cheap, order-insensitive
    /// proxy for "did the sketch change" (same heuristic the original uses).
    pub(crate) fn refresh(&mut self, sketch: &Sketch, points: impl Iterator<Item = (EntityId, Vec2)>) {
        let count = sketch.entities().count();
        if count == self.built_for_entity_count {
            return;
        }
        self.buckets.clear();
        for (id, pos) in points {
            self.buckets.entry(self.cell_of(pos)).or_default().push((id, pos));
        }
        self.built_for_entity_count = count;
    }

    /// Every `(id, position)` within `radius` of `center`'s 3x3 cell
    /// neighborhood (a superset of the true radius query; callers still
    /// filter by exact distance).
    pub(crate) fn query(&self, center: Vec2, radius: f64) -> Vec<(EntityId, Vec2)> {
        let half_span = (radius / self.cell_size).ceil() as i64 + 1;
        let (cx, cy) = self.cell_of(center);
        let mut out = Vec::new();
        for dx in -half_span..=half_span {
            for dy in -half_span..=half_span {
                if let Some(bucket) = self.buckets.get(&(cx + dx, cy + dy)) {
                    out.extend(bucket.iter().copied());
                }
            }
        }
        out
    }
}
