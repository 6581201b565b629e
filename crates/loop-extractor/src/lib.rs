//! Extracts closed faces (with holes) and leftover open wires from a
//! sketch's non-construction edges, grounded on `LoopDetector`.

mod graph;
mod types;

pub use types::{Face, LoopDetectionResult, LoopDetectorConfig, Wire};

use std::collections::HashSet;

use graph::{trace_faces, RawLoop};
use sketch_store::{EntityId, EntityKind, EntityShape, Sketch};
use waffle_types::Vec2;

pub struct LoopDetector {
    config: LoopDetectorConfig,
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(LoopDetectorConfig::default())
    }
}

impl LoopDetector {
    pub fn new(config: LoopDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoopDetectorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LoopDetectorConfig) {
        self.config = config;
    }

    /// Detects every face among the sketch's non-construction edges,
    /// optionally restricted to `selection`.
    pub fn detect(&self, sketch: &Sketch, selection: Option<&[EntityId]>) -> LoopDetectionResult {
        let candidate_ids = self.edge_candidates(sketch, selection);

        let mut circles = Vec::new();
        let mut non_circle_ids = Vec::new();
        for &id in &candidate_ids {
            match sketch.get_entity(id).map(|e| e.kind()) {
                Some(EntityKind::Circle) => circles.push(id),
                Some(EntityKind::Line) | Some(EntityKind::Arc) => non_circle_ids.push(id),
                _ => {}
            }
        }

        let mut raw_loops = Vec::new();

        let mut g = graph::build_segments(
            sketch,
            &non_circle_ids,
            self.config.coincidence_tolerance,
            self.config.arc_segments_per_full_turn,
        );
        if self.config.planarize_intersections {
            graph::planarize(&mut g, self.config.coincidence_tolerance);
        }
        raw_loops.extend(trace_faces(&g));

        for &id in &circles {
            if let Some(raw) = circle_as_loop(sketch, id, self.config.circle_segments) {
                raw_loops.push(raw);
            }
        }

        raw_loops.retain(|l| l.signed_area.abs() > self.config.degenerate_area_epsilon && l.points.len() >= 3);
        // Only the naturally-CCW trace of each simple boundary represents a
        // bounded face; its mirror (the same boundary's unbounded-side
        // trace) is discarded before nesting.
        let positive_loops: Vec<RawLoop> = raw_loops.into_iter().filter(|l| l.signed_area > 0.0).collect();

        let total_loops_found = positive_loops.len();
        let faces = if self.config.resolve_holes {
            build_face_hierarchy(positive_loops)
        } else {
            positive_loops
                .into_iter()
                .map(|l| Face {
                    outer: to_wire(l),
                    holes: Vec::new(),
                })
                .collect()
        };

        let faces_with_holes = faces.iter().filter(|f| !f.holes.is_empty()).count();

        let in_a_face = |id: &EntityId| {
            faces
                .iter()
                .any(|f| f.outer.entity_ids.contains(id) || f.holes.iter().any(|h| h.entity_ids.contains(id)))
        };

        let open_wires = self.find_open_wires(sketch, &non_circle_ids, &faces);
        let in_an_open_wire: HashSet<EntityId> = open_wires.iter().flat_map(|w| w.entity_ids.iter().copied()).collect();

        let unused_edges: Vec<EntityId> = non_circle_ids
            .iter()
            .copied()
            .filter(|id| !in_a_face(id) && !in_an_open_wire.contains(id))
            .chain(circles.iter().copied().filter(|id| !in_a_face(id)))
            .collect();

        let isolated_points: Vec<EntityId> = sketch
            .entities()
            .filter(|e| e.kind() == EntityKind::Point)
            .filter(|e| e.connected_entities().map(|c| c.is_empty()).unwrap_or(true))
            .map(|e| e.id)
            .collect();

        LoopDetectionResult {
            faces,
            open_wires,
            isolated_points,
            unused_edges,
            success: true,
            error: None,
            total_loops_found,
            faces_with_holes,
        }
    }

    fn edge_candidates(&self, sketch: &Sketch, selection: Option<&[EntityId]>) -> Vec<EntityId> {
        sketch
            .entities()
            .filter(|e| !e.construction)
            .filter(|e| matches!(e.kind(), EntityKind::Line | EntityKind::Arc | EntityKind::Circle))
            .filter(|e| selection.map(|sel| sel.contains(&e.id)).unwrap_or(true))
            .map(|e| e.id)
            .collect()
    }

    /// Grows open-wire chains from whatever non-circle edges didn't end up
    /// in a face, by walking nodes of degree <= 2.
    fn find_open_wires(&self, sketch: &Sketch, candidate_ids: &[EntityId], faces: &[Face]) -> Vec<Wire> {
        let used: HashSet<EntityId> = faces
            .iter()
            .flat_map(|f| f.outer.entity_ids.iter().copied().chain(f.holes.iter().flat_map(|h| h.entity_ids.iter().copied())))
            .collect();
        let remaining: Vec<EntityId> = candidate_ids.iter().copied().filter(|id| !used.contains(id)).collect();
        if remaining.is_empty() {
            return Vec::new();
        }

        let mut wires = Vec::new();
        let mut consumed: HashSet<EntityId> = HashSet::new();
        for &id in &remaining {
            if consumed.contains(&id) {
                continue;
            }
            let mut chain = vec![id];
            let mut pool: Vec<EntityId> = remaining.iter().copied().filter(|e| *e != id && !consumed.contains(e)).collect();
            grow_chain(sketch, &mut chain, &mut pool, self.config.coincidence_tolerance);
            for e in &chain {
                consumed.insert(*e);
            }
            if let Some(wire) = build_wire(sketch, &chain) {
                wires.push(wire);
            }
        }
        wires
    }
}

/// Greedily extends `chain` at both ends using entities from `pool` that
/// share a coordinate endpoint, removing them from `pool` as they're used.
fn grow_chain(sketch: &Sketch, chain: &mut Vec<EntityId>, pool: &mut Vec<EntityId>, tolerance: f64) {
    loop {
        let Some((head, _)) = entity_endpoints(sketch, *chain.first().unwrap()) else { break };
        let Some((_, tail)) = entity_endpoints(sketch, *chain.last().unwrap()) else { break };

        let mut extended = false;
        if let Some(pos) = pool.iter().position(|&id| {
            entity_endpoints(sketch, id).map(|(a, b)| a.distance(tail) < tolerance || b.distance(tail) < tolerance).unwrap_or(false)
        }) {
            chain.push(pool.remove(pos));
            extended = true;
        } else if let Some(pos) = pool.iter().position(|&id| {
            entity_endpoints(sketch, id).map(|(a, b)| a.distance(head) < tolerance || b.distance(head) < tolerance).unwrap_or(false)
        }) {
            chain.insert(0, pool.remove(pos));
            extended = true;
        }
        if !extended {
            break;
        }
    }
}

fn entity_endpoints(sketch: &Sketch, id: EntityId) -> Option<(Vec2, Vec2)> {
    let entity = sketch.get_entity(id)?;
    match &entity.shape {
        EntityShape::Line { start, end } => {
            let (sx, sy) = sketch.get_entity(*start)?.as_point()?;
            let (ex, ey) = sketch.get_entity(*end)?.as_point()?;
            Some((Vec2::new(sx, sy), Vec2::new(ex, ey)))
        }
        EntityShape::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => {
            let (cx, cy) = sketch.get_entity(*center)?.as_point()?;
            let c = Vec2::new(cx, cy);
            let start = c + Vec2::new(start_angle.cos(), start_angle.sin()) * *radius;
            let end = c + Vec2::new(end_angle.cos(), end_angle.sin()) * *radius;
            Some((start, end))
        }
        _ => None,
    }
}

fn circle_as_loop(sketch: &Sketch, id: EntityId, segments: usize) -> Option<RawLoop> {
    let entity = sketch.get_entity(id)?;
    let EntityShape::Circle { center, radius } = entity.shape else {
        return None;
    };
    let (cx, cy) = sketch.get_entity(center)?.as_point()?;
    let points = waffle_types::sample_circle(Vec2::new(cx, cy), radius, segments);
    let area = graph::shoelace(&points);
    Some(RawLoop {
        points,
        entity_ids: vec![id],
        signed_area: area,
    })
}

fn to_wire(raw: RawLoop) -> Wire {
    let mut points = raw.points;
    points.push(points[0]);
    let mut entity_ids = raw.entity_ids;
    entity_ids.dedup();
    Wire {
        entity_ids,
        points,
        signed_area: raw.signed_area,
    }
}

fn reverse_wire(mut wire: Wire) -> Wire {
    wire.points.reverse();
    wire.entity_ids.reverse();
    wire.signed_area = -wire.signed_area;
    wire
}

/// Sorts candidate loops by descending area, assigns each a parent (the
/// smallest-area loop that contains it) via bounding-box-prune and
/// point-in-polygon, and groups even-depth loops as outer boundaries with
/// their odd-depth descendants as holes.
fn build_face_hierarchy(loops: Vec<RawLoop>) -> Vec<Face> {
    let mut indexed: Vec<(usize, RawLoop)> = loops.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.signed_area.abs().partial_cmp(&a.1.signed_area.abs()).unwrap());

    let n = indexed.len();
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut depth: Vec<usize> = vec![0; n];

    let bboxes: Vec<(Vec2, Vec2)> = indexed
        .iter()
        .map(|(_, l)| {
            let min = Vec2::new(
                l.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
                l.points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
            );
            let max = Vec2::new(
                l.points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
                l.points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
            );
            (min, max)
        })
        .collect();

    for i in 0..n {
        let centroid = graph::centroid(&indexed[i].1.points);
        for j in 0..i {
            let (min, max) = bboxes[j];
            if centroid.x < min.x || centroid.x > max.x || centroid.y < min.y || centroid.y > max.y {
                continue;
            }
            if types::point_in_polygon(centroid, &indexed[j].1.points) {
                parent[i] = Some(j);
                depth[i] = depth[j] + 1;
                break;
            }
        }
    }

    let mut outer_face: Vec<Option<usize>> = vec![None; n];
    let mut faces: Vec<Face> = Vec::new();
    for i in 0..n {
        if depth[i] % 2 == 0 {
            let wire = to_wire_from(&indexed[i].1);
            faces.push(Face { outer: wire, holes: Vec::new() });
            outer_face[i] = Some(faces.len() - 1);
        }
    }
    for i in 0..n {
        if depth[i] % 2 == 1 {
            if let Some(p) = parent[i] {
                if let Some(face_idx) = outer_face[p] {
                    let hole = reverse_wire(to_wire_from(&indexed[i].1));
                    faces[face_idx].holes.push(hole);
                }
            }
        }
    }
    faces
}

fn to_wire_from(raw: &RawLoop) -> Wire {
    let mut points = raw.points.clone();
    points.push(points[0]);
    let mut entity_ids = raw.entity_ids.clone();
    entity_ids.dedup();
    Wire {
        entity_ids,
        points,
        signed_area: raw.signed_area,
    }
}

pub fn find_loop_at_point(sketch: &Sketch, point: Vec2) -> Option<Face> {
    let result = LoopDetector::default().detect(sketch, None);
    result
        .faces
        .into_iter()
        .filter(|f| f.contains_point(point))
        .min_by(|a, b| a.area().partial_cmp(&b.area()).unwrap())
}

pub fn is_closed_loop(sketch: &Sketch, entity_ids: &[EntityId]) -> bool {
    build_wire(sketch, entity_ids).map(|w| w.is_closed()).unwrap_or(false)
}

/// Orders `entity_ids` into a single connected walk if possible: circles
/// must appear alone (they have no endpoints to chain); lines/arcs are
/// chained by matching endpoint coordinates. Fails (returns `None`) if the
/// entities don't form a single simple path or cycle.
pub fn build_wire(sketch: &Sketch, entity_ids: &[EntityId]) -> Option<Wire> {
    if entity_ids.is_empty() {
        return None;
    }
    if entity_ids.len() == 1 {
        if let Some(entity) = sketch.get_entity(entity_ids[0]) {
            if let EntityShape::Circle { .. } = entity.shape {
                return circle_as_loop(sketch, entity_ids[0], 32).map(to_wire);
            }
        }
    }
    if entity_ids.iter().any(|id| matches!(sketch.get_entity(*id).map(|e| e.kind()), Some(EntityKind::Circle))) {
        return None;
    }

    let mut chain = vec![entity_ids[0]];
    let mut pool: Vec<EntityId> = entity_ids[1..].to_vec();
    grow_chain(sketch, &mut chain, &mut pool, 1e-4);
    if !pool.is_empty() || chain.len() != entity_ids.len() {
        return None;
    }

    let mut points = Vec::new();
    for &id in &chain {
        let (a, b) = entity_endpoints(sketch, id)?;
        if points.is_empty() {
            points.push(a);
            points.push(b);
            continue;
        }
        // Whichever endpoint is nearer the running tail is the connection
        // point; the other extends the walk. Handles entities stored
        // reversed relative to the walk direction.
        let tail = *points.last().unwrap();
        if a.distance(tail) <= b.distance(tail) {
            points.push(b);
        } else {
            points.push(a);
        }
    }
    let signed_area = if points.first().map(|p| p.distance(*points.last().unwrap()) < 1e-4).unwrap_or(false) {
        graph::shoelace(&points)
    } else {
        0.0
    };
    Some(Wire {
        entity_ids: chain,
        points,
        signed_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(sketch: &mut Sketch) -> [EntityId; 4] {
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 10.0, false);
        let p3 = sketch.add_point(0.0, 10.0, false);
        let l0 = sketch.add_line(p0, p1, false).unwrap();
        let l1 = sketch.add_line(p1, p2, false).unwrap();
        let l2 = sketch.add_line(p2, p3, false).unwrap();
        let l3 = sketch.add_line(p3, p0, false).unwrap();
        [l0, l1, l2, l3]
    }

    #[test]
    fn square_yields_one_ccw_face_of_area_100() {
        let mut sketch = Sketch::new();
        square(&mut sketch);
        let result = LoopDetector::default().detect(&sketch, None);
        assert_eq!(result.faces.len(), 1);
        let face = &result.faces[0];
        assert!(face.outer.is_ccw());
        assert!((face.area() - 100.0).abs() < 1e-6);
        assert!(face.holes.is_empty());
    }

    #[test]
    fn nested_square_produces_a_hole() {
        let mut sketch = Sketch::new();
        square(&mut sketch);
        let q0 = sketch.add_point(2.0, 2.0, false);
        let q1 = sketch.add_point(8.0, 2.0, false);
        let q2 = sketch.add_point(8.0, 8.0, false);
        let q3 = sketch.add_point(2.0, 8.0, false);
        sketch.add_line(q0, q1, false).unwrap();
        sketch.add_line(q1, q2, false).unwrap();
        sketch.add_line(q2, q3, false).unwrap();
        sketch.add_line(q3, q0, false).unwrap();

        let result = LoopDetector::default().detect(&sketch, None);
        assert_eq!(result.faces.len(), 1);
        let face = &result.faces[0];
        assert_eq!(face.holes.len(), 1);
        assert!(!face.holes[0].is_ccw());
        assert!((face.area() - (100.0 - 36.0)).abs() < 1e-6);
    }

    #[test]
    fn construction_geometry_is_excluded() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, true);
        let p1 = sketch.add_point(10.0, 0.0, true);
        sketch.add_line(p0, p1, true).unwrap();
        let result = LoopDetector::default().detect(&sketch, None);
        assert!(result.faces.is_empty());
    }

    #[test]
    fn open_chain_is_reported_as_an_open_wire() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(10.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 10.0, false);
        sketch.add_line(p0, p1, false).unwrap();
        sketch.add_line(p1, p2, false).unwrap();
        let result = LoopDetector::default().detect(&sketch, None);
        assert!(result.faces.is_empty());
        assert_eq!(result.open_wires.len(), 1);
        assert!(!result.open_wires[0].is_closed());
    }

    #[test]
    fn build_wire_orders_a_shuffled_chain() {
        let mut sketch = Sketch::new();
        let [l0, l1, l2, l3] = square(&mut sketch);
        let wire = build_wire(&sketch, &[l2, l0, l3, l1]).unwrap();
        assert!(wire.is_closed());
        assert_eq!(wire.entity_ids.len(), 4);
    }

    #[test]
    fn is_closed_loop_detects_closure() {
        let mut sketch = Sketch::new();
        let ids = square(&mut sketch);
        assert!(is_closed_loop(&sketch, &ids));
    }

    #[test]
    fn find_loop_at_point_returns_smallest_containing_face() {
        let mut sketch = Sketch::new();
        square(&mut sketch);
        let found = find_loop_at_point(&sketch, Vec2::new(5.0, 5.0));
        assert!(found.is_some());
    }

    #[test]
    fn lone_circle_is_its_own_face() {
        let mut sketch = Sketch::new();
        let c = sketch.add_point(0.0, 0.0, false);
        sketch.add_circle(c, 3.0, false).unwrap();
        let result = LoopDetector::default().detect(&sketch, None);
        assert_eq!(result.faces.len(), 1);
        assert!((result.faces[0].area() - std::f64::consts::PI * 9.0).abs() < 1e-2);
    }
}
