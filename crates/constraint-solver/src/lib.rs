//! Drives `sketch_store::Sketch` to a solution: Gauss-Newton with
//! Levenberg-Marquardt damping over an analytically-built Jacobian (with a
//! finite-difference fallback for a handful of constraint kinds), plus a
//! drag-solve mode with bounded-deviation rejection.

mod layout;
mod linear;
mod residual;

use thiserror::Error;

use sketch_store::{ConstraintId, EntityId, Sketch};
use waffle_types::Vec2;

/// How far (in solver tolerance units) a drag-solve's dragged point may end
/// up from the requested target before the drag is rejected and rolled back.
const DRAG_REJECTION_FACTOR: f64 = 2.0;

const LAMBDA_RETRIES: usize = 10;
const MIN_LAMBDA: f64 = 1e-15;

#[derive(Debug)]
pub struct SolverResult {
    pub converged: bool,
    pub iterations: usize,
    pub final_residual: f64,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver did not converge after {max_iterations} iterations (residual: {residual})")]
    DidNotConverge { max_iterations: usize, residual: f64 },
    #[error("over-constrained: constraints are contradictory")]
    OverConstrained,
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub lambda_initial: f64,
    pub lambda_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            lambda_initial: 1e-3,
            lambda_factor: 10.0,
        }
    }
}

/// Solves the sketch's current constraint set in place.
pub fn solve(sketch: &mut Sketch, config: &SolverConfig) -> Result<SolverResult, SolverError> {
    solve_internal(sketch, &[], config)
}

/// A captured pre-drag snapshot, used to roll back a rejected drag.
pub struct DragSession {
    pub dragged_point: EntityId,
    snapshot: Sketch,
}

/// Begins a drag on `dragged_point`, snapshotting the sketch so a later
/// rejected drag-solve can be rolled back. Returns `None` if the point
/// doesn't exist.
pub fn begin_point_drag(sketch: &Sketch, dragged_point: EntityId) -> Option<DragSession> {
    sketch.get_entity(dragged_point)?;
    Some(DragSession {
        dragged_point,
        snapshot: sketch.clone(),
    })
}

/// Ends a drag session without further action; the sketch is left as the
/// last `solve_with_drag` call applied it.
pub fn end_point_drag(_session: DragSession) {}

#[derive(Debug)]
pub enum DragOutcome {
    Applied(SolverResult),
    /// The dragged point could not be placed within tolerance of `target`
    /// (or the solve diverged); the sketch was rolled back to its state at
    /// `begin_point_drag`.
    Rejected { deviation: f64, reason: String },
}

/// Re-solves with `session.dragged_point` pinned to `target` and every point
/// in `fixed_points` pinned to its current position, then checks how close
/// the dragged point actually landed to `target`. If the deviation exceeds
/// `DRAG_REJECTION_FACTOR * sqrt(tolerance)`, the sketch is rolled back to
/// its pre-drag snapshot and the drag is rejected rather than applied.
pub fn solve_with_drag(
    sketch: &mut Sketch,
    session: &DragSession,
    target: Vec2,
    fixed_points: &[EntityId],
    config: &SolverConfig,
) -> DragOutcome {
    let mut pins: Vec<(EntityId, Vec2)> = vec![(session.dragged_point, target)];
    for &id in fixed_points {
        if let Some((x, y)) = sketch.get_entity(id).and_then(|e| e.as_point()) {
            pins.push((id, Vec2::new(x, y)));
        }
    }

    let outcome = solve_internal(sketch, &pins, config);
    let landed = sketch.get_entity(session.dragged_point).and_then(|e| e.as_point());
    let deviation = landed.map(|(x, y)| Vec2::new(x, y).distance(target)).unwrap_or(f64::INFINITY);
    let rejection_threshold = DRAG_REJECTION_FACTOR * config.tolerance.sqrt();

    match outcome {
        Ok(result) if deviation <= rejection_threshold => DragOutcome::Applied(result),
        _ => {
            *sketch = session.snapshot.clone();
            DragOutcome::Rejected {
                deviation,
                reason: "Dragged point cannot reach target".to_string(),
            }
        }
    }
}

fn solve_internal(sketch: &mut Sketch, pins: &[(EntityId, Vec2)], config: &SolverConfig) -> Result<SolverResult, SolverError> {
    if pins.is_empty() && sketch.is_over_constrained() {
        // A true rank-revealing analysis of the Jacobian would pin down the
        // exact redundant rows; absent that, dimensional constraints (the
        // usual source of excess equations over a sketch's geometric DOF)
        // are reported as the conflicting set.
        let conflicting: Vec<ConstraintId> = sketch
            .constraints()
            .filter(|c| c.kind.is_dimensional())
            .map(|c| c.id)
            .collect();
        sketch.set_conflicting_constraints(conflicting);
        return Err(SolverError::OverConstrained);
    }
    sketch.set_conflicting_constraints(Vec::new());

    let (layout, mut params) = layout::build(sketch);
    let n = params.len();

    if n == 0 {
        return Ok(SolverResult {
            converged: true,
            iterations: 0,
            final_residual: 0.0,
        });
    }

    let mut lambda = config.lambda_initial;

    for iteration in 0..config.max_iterations {
        let residuals = residual::collect_residuals(sketch, &layout, &params, pins);
        let m = residuals.len();
        let total_sq: f64 = residuals.iter().map(|r| r * r).sum();

        if total_sq < config.tolerance {
            layout::write_back(sketch, &layout, &params);
            sketch.clear_dirty();
            return Ok(SolverResult {
                converged: true,
                iterations: iteration,
                final_residual: total_sq,
            });
        }

        let jacobian = residual::build_jacobian(sketch, &layout, &params, pins, m, n);

        let mut jtr = vec![0.0; n];
        for j in 0..n {
            for i in 0..m {
                jtr[j] += jacobian[i * n + j] * residuals[i];
            }
        }
        let mut jtj = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..m {
                    sum += jacobian[k * n + i] * jacobian[k * n + j];
                }
                jtj[i * n + j] = sum;
            }
        }

        let mut found_better = false;
        for _ in 0..LAMBDA_RETRIES {
            let mut damped = jtj.clone();
            for i in 0..n {
                damped[i * n + i] += lambda;
            }
            if let Some(dx) = linear::solve(&damped, &jtr, n) {
                let mut candidate = params.clone();
                for i in 0..n {
                    candidate[i] -= dx[i];
                }
                let candidate_sq: f64 = residual::collect_residuals(sketch, &layout, &candidate, pins)
                    .iter()
                    .map(|r| r * r)
                    .sum();
                if candidate_sq < total_sq {
                    params = candidate;
                    lambda = (lambda / config.lambda_factor).max(MIN_LAMBDA);
                    found_better = true;
                    break;
                }
            }
            lambda *= config.lambda_factor;
        }

        if !found_better {
            let grad_norm_sq: f64 = jtr.iter().map(|g| g * g).sum();
            if grad_norm_sq > 1e-20 {
                let step = 0.01 / grad_norm_sq.sqrt();
                for i in 0..n {
                    params[i] -= step * jtr[i];
                }
            }
            lambda *= config.lambda_factor;
        }
    }

    let final_residual: f64 = residual::collect_residuals(sketch, &layout, &params, pins)
        .iter()
        .map(|r| r * r)
        .sum();
    layout::write_back(sketch, &layout, &params);

    if final_residual < config.tolerance {
        sketch.clear_dirty();
        Ok(SolverResult {
            converged: true,
            iterations: config.max_iterations,
            final_residual,
        })
    } else {
        tracing::warn!(residual = final_residual, "solver did not converge");
        Err(SolverError::DidNotConverge {
            max_iterations: config.max_iterations,
            residual: final_residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_horizontal_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 5.0, false);
        let line = sketch.add_line(p1, p2, false).unwrap();
        sketch.add_fixed(p1).unwrap();
        sketch.add_horizontal(line).unwrap();

        let result = solve(&mut sketch, &SolverConfig::default()).unwrap();
        assert!(result.converged);

        let (_, y1) = sketch.get_entity(p1).unwrap().as_point().unwrap();
        let (_, y2) = sketch.get_entity(p2).unwrap().as_point().unwrap();
        assert!((y1 - y2).abs() < 1e-6);
    }

    #[test]
    fn solves_distance_constraint() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0, false);
        let p2 = sketch.add_point(3.0, 4.0, false);
        sketch.add_fixed(p1).unwrap();
        sketch.add_distance(p1, p2, 10.0).unwrap();

        solve(&mut sketch, &SolverConfig::default()).unwrap();
        let (x2, y2) = sketch.get_entity(p2).unwrap().as_point().unwrap();
        assert!(((x2 * x2 + y2 * y2).sqrt() - 10.0).abs() < 0.01);
    }

    #[test]
    fn already_satisfied_converges_immediately() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 0.0, false);
        let line = sketch.add_line(p1, p2, false).unwrap();
        sketch.add_horizontal(line).unwrap();

        let result = solve(&mut sketch, &SolverConfig::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn fully_constrained_rectangle_reaches_target_dimensions() {
        let mut sketch = Sketch::new();
        let p0 = sketch.add_point(0.0, 0.0, false);
        let p1 = sketch.add_point(9.0, 0.5, false);
        let p2 = sketch.add_point(9.5, 4.5, false);
        let p3 = sketch.add_point(0.5, 5.5, false);
        let l0 = sketch.add_line(p0, p1, false).unwrap();
        let l1 = sketch.add_line(p1, p2, false).unwrap();
        let l2 = sketch.add_line(p2, p3, false).unwrap();
        let l3 = sketch.add_line(p3, p0, false).unwrap();

        sketch.add_fixed(p0).unwrap();
        sketch.add_horizontal(l0).unwrap();
        sketch.add_horizontal(l2).unwrap();
        sketch.add_vertical(l1).unwrap();
        sketch.add_vertical(l3).unwrap();
        sketch.add_distance(p0, p1, 10.0).unwrap();
        sketch.add_distance(p1, p2, 5.0).unwrap();

        let config = SolverConfig {
            max_iterations: 200,
            ..SolverConfig::default()
        };
        solve(&mut sketch, &config).unwrap();

        let (x1, y1) = sketch.get_entity(p1).unwrap().as_point().unwrap();
        assert!((x1 - 10.0).abs() < 0.5);
        assert!(y1.abs() < 0.1);
    }

    #[test]
    fn drag_within_tolerance_is_applied() {
        let mut sketch = Sketch::new();
        let p = sketch.add_point(0.0, 0.0, false);
        let session = begin_point_drag(&sketch, p).unwrap();
        let outcome = solve_with_drag(&mut sketch, &session, Vec2::new(5.0, 5.0), &[], &SolverConfig::default());
        assert!(matches!(outcome, DragOutcome::Applied(_)));
        let (x, y) = sketch.get_entity(p).unwrap().as_point().unwrap();
        assert!((x - 5.0).abs() < 1e-6 && (y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn drag_conflicting_with_fixed_geometry_is_rejected_and_rolled_back() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 0.0, false);
        sketch.add_distance(p1, p2, 10.0).unwrap();
        sketch.add_fixed(p1).unwrap();

        let session = begin_point_drag(&sketch, p2).unwrap();
        // Asking p2 to move to a point only 1 unit away violates the fixed 10-unit distance.
        let outcome = solve_with_drag(&mut sketch, &session, Vec2::new(1.0, 0.0), &[], &SolverConfig::default());
        assert!(matches!(outcome, DragOutcome::Rejected { .. }));
        let (x2, _) = sketch.get_entity(p2).unwrap().as_point().unwrap();
        assert!((x2 - 10.0).abs() < 1e-6, "sketch should have rolled back, x2={x2}");
    }

    #[test]
    fn over_constrained_sketch_populates_conflicting_constraints() {
        let mut sketch = Sketch::new();
        let p1 = sketch.add_point(0.0, 0.0, false);
        let p2 = sketch.add_point(10.0, 0.0, false);
        sketch.add_fixed(p1).unwrap();
        sketch.add_fixed(p2).unwrap();
        let distance = sketch.add_distance(p1, p2, 5.0).unwrap();

        assert!(sketch.is_over_constrained());
        let result = solve(&mut sketch, &SolverConfig::default());
        assert!(matches!(result, Err(SolverError::OverConstrained)));
        assert_eq!(sketch.get_conflicting_constraints(), &[distance]);

        // Removing the offending constraint clears the conflicting set on the next solve.
        sketch.remove_constraint(distance);
        let result = solve(&mut sketch, &SolverConfig::default());
        assert!(result.is_ok());
        assert!(sketch.get_conflicting_constraints().is_empty());
    }

    #[test]
    fn radius_constraint_solves() {
        let mut sketch = Sketch::new();
        let c = sketch.add_point(0.0, 0.0, false);
        sketch.add_fixed(c).unwrap();
        let circle = sketch.add_circle(c, 3.0, false).unwrap();
        sketch.add_radius(circle, 10.0).unwrap();

        solve(&mut sketch, &SolverConfig::default()).unwrap();
        if let sketch_store::EntityShape::Circle { radius, .. } = sketch.get_entity(circle).unwrap().shape {
            assert!((radius - 10.0).abs() < 1e-6);
        } else {
            panic!("expected circle");
        }
    }
}
