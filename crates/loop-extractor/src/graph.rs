//! Adjacency-graph construction, planarization, and half-edge face tracing.

use sketch_store::{EntityId, EntityShape, Sketch};
use waffle_types::{sample_arc, Vec2};

pub(crate) struct Segment {
    pub a: usize,
    pub b: usize,
    pub source: EntityId,
}

pub(crate) struct PlanarGraph {
    pub nodes: Vec<Vec2>,
    pub segments: Vec<Segment>,
}

/// One directed traversal of a graph edge. `edges[i]` and `edges[i ^ 1]` are
/// always twins (segments are pushed in pairs).
struct HalfEdge {
    from: usize,
    to: usize,
    source: EntityId,
}

pub(crate) struct RawLoop {
    pub points: Vec<Vec2>,
    pub entity_ids: Vec<EntityId>,
    pub signed_area: f64,
}

fn find_or_insert_node(nodes: &mut Vec<Vec2>, pos: Vec2, tolerance: f64) -> usize {
    for (i, n) in nodes.iter().enumerate() {
        if n.distance(pos) <= tolerance {
            return i;
        }
    }
    nodes.push(pos);
    nodes.len() - 1
}

/// Builds the raw (pre-planarization) segment list for every non-construction
/// line/arc among `entity_ids`. Circles are excluded; callers treat a whole
/// circle as its own closed loop directly (they are never split).
pub(crate) fn build_segments(
    sketch: &Sketch,
    entity_ids: &[EntityId],
    tolerance: f64,
    arc_segments_per_full_turn: usize,
) -> PlanarGraph {
    let mut nodes = Vec::new();
    let mut segments = Vec::new();

    for &id in entity_ids {
        let Some(entity) = sketch.get_entity(id) else { continue };
        match &entity.shape {
            EntityShape::Line { start, end } => {
                let (Some((sx, sy)), Some((ex, ey))) = (
                    sketch.get_entity(*start).and_then(|e| e.as_point()),
                    sketch.get_entity(*end).and_then(|e| e.as_point()),
                ) else {
                    continue;
                };
                let a = find_or_insert_node(&mut nodes, Vec2::new(sx, sy), tolerance);
                let b = find_or_insert_node(&mut nodes, Vec2::new(ex, ey), tolerance);
                if a != b {
                    segments.push(Segment { a, b, source: id });
                }
            }
            EntityShape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let Some((cx, cy)) = sketch.get_entity(*center).and_then(|e| e.as_point()) else {
                    continue;
                };
                let sweep = waffle_types::normalize_sweep(*start_angle, *end_angle);
                let n = ((sweep / (2.0 * std::f64::consts::PI) * arc_segments_per_full_turn as f64).ceil() as usize).max(8);
                let pts = sample_arc(Vec2::new(cx, cy), *radius, *start_angle, *end_angle, n);
                for w in pts.windows(2) {
                    let a = find_or_insert_node(&mut nodes, w[0], tolerance);
                    let b = find_or_insert_node(&mut nodes, w[1], tolerance);
                    if a != b {
                        segments.push(Segment { a, b, source: id });
                    }
                }
            }
            _ => {}
        }
    }

    PlanarGraph { nodes, segments }
}

/// Splits every segment at every proper intersection with another segment
/// O(n^2) in segment count; fine for sketch-scale inputs.
pub(crate) fn planarize(graph: &mut PlanarGraph, tolerance: f64) {
    let n = graph.segments.len();
    let mut split_params: Vec<Vec<f64>> = (0..n).map(|_| vec![0.0, 1.0]).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let (a1, b1) = (graph.nodes[graph.segments[i].a], graph.nodes[graph.segments[i].b]);
            let (a2, b2) = (graph.nodes[graph.segments[j].a], graph.nodes[graph.segments[j].b]);
            if let Some((t1, t2)) = segment_intersection_params(a1, b1, a2, b2) {
                if t1 > 1e-9 && t1 < 1.0 - 1e-9 {
                    split_params[i].push(t1);
                }
                if t2 > 1e-9 && t2 < 1.0 - 1e-9 {
                    split_params[j].push(t2);
                }
            }
        }
    }

    let mut new_segments = Vec::new();
    for (i, seg) in graph.segments.iter().enumerate() {
        let mut ts = split_params[i].clone();
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let a_pos = graph.nodes[seg.a];
        let b_pos = graph.nodes[seg.b];
        let mut prev_node = seg.a;
        for &t in ts.iter().skip(1) {
            let node = if t >= 1.0 - 1e-9 {
                seg.b
            } else {
                let pos = a_pos.lerp(b_pos, t);
                find_or_insert_node_existing(&graph.nodes, pos, tolerance)
            };
            if node != prev_node {
                new_segments.push(Segment {
                    a: prev_node,
                    b: node,
                    source: seg.source,
                });
                prev_node = node;
            }
        }
    }
    graph.segments = dedup_segments(new_segments);
}

fn find_or_insert_node_existing(nodes: &[Vec2], pos: Vec2, tolerance: f64) -> usize {
    for (i, n) in nodes.iter().enumerate() {
        if n.distance(pos) <= tolerance {
            return i;
        }
    }
    // Split points not already present (shouldn't happen since callers only
    // compute these from existing node pairs) fall back to nearest node.
    nodes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.distance(pos).partial_cmp(&b.distance(pos)).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn dedup_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for seg in segments {
        let key = (seg.a.min(seg.b), seg.a.max(seg.b));
        if seen.insert(key) {
            out.push(seg);
        }
    }
    out
}

/// Returns `(t1, t2)` parameters along each segment at their proper
/// intersection, if the segments cross within their finite extents.
fn segment_intersection_params(a1: Vec2, b1: Vec2, a2: Vec2, b2: Vec2) -> Option<(f64, f64)> {
    let d1 = b1 - a1;
    let d2 = b2 - a2;
    let denom = d1.cross(d2);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t1 = (a2 - a1).cross(d2) / denom;
    let t2 = (a2 - a1).cross(d1) / denom;
    if (0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2) {
        Some((t1, t2))
    } else {
        None
    }
}

/// Traces every bounded face cycle via the half-edge next-rule: at each
/// destination node, outgoing half-edges are sorted by emission angle, and
/// `next` is the one step clockwise from the current edge's twin.
pub(crate) fn trace_faces(graph: &PlanarGraph) -> Vec<RawLoop> {
    let mut half_edges = Vec::with_capacity(graph.segments.len() * 2);
    for seg in &graph.segments {
        half_edges.push(HalfEdge {
            from: seg.a,
            to: seg.b,
            source: seg.source,
        });
        half_edges.push(HalfEdge {
            from: seg.b,
            to: seg.a,
            source: seg.source,
        });
    }

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    for (i, he) in half_edges.iter().enumerate() {
        outgoing[he.from].push(i);
    }
    for list in &mut outgoing {
        list.sort_by(|&i, &j| {
            let ai = angle_of(graph.nodes[half_edges[i].from], graph.nodes[half_edges[i].to]);
            let aj = angle_of(graph.nodes[half_edges[j].from], graph.nodes[half_edges[j].to]);
            ai.partial_cmp(&aj).unwrap()
        });
    }

    let twin = |i: usize| -> usize { i ^ 1 };
    let next = |he: usize| -> usize {
        let v = half_edges[he].to;
        let t = twin(he);
        let list = &outgoing[v];
        let pos = list.iter().position(|&h| h == t).unwrap();
        let prev = (pos + list.len() - 1) % list.len();
        list[prev]
    };

    let mut visited = vec![false; half_edges.len()];
    let mut loops = Vec::new();

    for start in 0..half_edges.len() {
        if visited[start] {
            continue;
        }
        let mut points = Vec::new();
        let mut entity_ids = Vec::new();
        let mut current = start;
        loop {
            if visited[current] {
                // A malformed graph (e.g. a dangling half-edge whose twin
                // list position couldn't be recovered) could cycle back
                // into already-visited territory without reaching `start`;
                // bail rather than loop forever.
                break;
            }
            visited[current] = true;
            points.push(graph.nodes[half_edges[current].to]);
            entity_ids.push(half_edges[current].source);
            let nxt = next(current);
            if nxt == start {
                break;
            }
            current = nxt;
        }
        if points.len() < 3 {
            continue;
        }
        let area = shoelace(&points);
        loops.push(RawLoop {
            points,
            entity_ids,
            signed_area: area,
        });
    }
    loops
}

fn angle_of(from: Vec2, to: Vec2) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}

pub(crate) fn shoelace(points: &[Vec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

pub(crate) fn centroid(points: &[Vec2]) -> Vec2 {
    let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
    sum * (1.0 / points.len() as f64)
}
