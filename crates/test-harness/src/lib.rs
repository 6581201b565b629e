//! Shared builders for the cross-crate integration tests in `tests/`.

use sketch_store::{EntityId, Sketch};

/// Four lines (0,0)->(s,0)->(s,s)->(0,s)->(0,0), matching the
/// loop-on-square scenario.
pub fn square_sketch(side: f64) -> (Sketch, [EntityId; 4]) {
    let mut sketch = Sketch::new();
    let p0 = sketch.add_point(0.0, 0.0, false);
    let p1 = sketch.add_point(side, 0.0, false);
    let p2 = sketch.add_point(side, side, false);
    let p3 = sketch.add_point(0.0, side, false);

    let l0 = sketch.add_line(p0, p1, false).unwrap();
    let l1 = sketch.add_line(p1, p2, false).unwrap();
    let l2 = sketch.add_line(p2, p3, false).unwrap();
    let l3 = sketch.add_line(p3, p0, false).unwrap();

    (sketch, [l0, l1, l2, l3])
}
