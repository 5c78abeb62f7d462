//! SLSQP-style sequential quadratic programming solver
//!
//! Minimizes a smooth objective over `{ x : Σ x = budget, l ≤ x ≤ u }`.
//! Each outer iteration builds a quadratic model of the objective from a
//! finite-difference gradient and a damped BFGS Hessian approximation,
//! solves the quadratic subproblem over the feasible set by projected
//! gradient descent, and line-searches along the resulting direction:
//!
//!   d_k = argmin_{x_k + d feasible}  g_k·d + ½ d^T B_k d
//!
//! The Euclidean projection onto the bounded simplex is computed exactly
//! by bisection on the dual shift. The method is deterministic and never
//! leaves the feasible set: the starting point is projected once and every
//! accepted step stays on the segment between two feasible points.

use super::{Solution, Solver, SolverError, WeightBounds};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Sufficient-decrease constant for the Armijo line search
const ARMIJO_C1: f64 = 1e-4;

/// Maximum number of step halvings per line search
const MAX_BACKTRACKS: usize = 30;

/// Slack used when checking that the bounds admit the budget
const FEASIBILITY_TOL: f64 = 1e-9;

/// SLSQP solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlsqpConfig {
    /// Maximum outer iterations (default: 200)
    pub max_iterations: usize,

    /// Relative tolerance on the objective decrease (default: 1e-9)
    pub ftol: f64,

    /// Tolerance on the step norm: below this the iterate is stationary
    /// (default: 1e-10)
    pub step_tol: f64,

    /// Relative finite-difference step for the gradient (default: 1e-7)
    pub gradient_step: f64,

    /// Projected-gradient iterations per quadratic subproblem (default: 100)
    pub qp_iterations: usize,
}

impl Default for SlsqpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-9,
            step_tol: 1e-10,
            gradient_step: 1e-7,
            qp_iterations: 100,
        }
    }
}

/// SLSQP-style sequential quadratic programming solver
#[derive(Debug, Clone, Default)]
pub struct SlsqpSolver {
    config: SlsqpConfig,
}

impl SlsqpSolver {
    /// Create a new solver with the given configuration
    pub fn new(config: SlsqpConfig) -> Result<Self, SolverError> {
        if config.max_iterations == 0 || config.qp_iterations == 0 {
            return Err(SolverError::InvalidParameter(
                "iteration counts must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("ftol", config.ftol),
            ("step_tol", config.step_tol),
            ("gradient_step", config.gradient_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SolverError::InvalidParameter(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(Self { config })
    }

    /// Central-difference gradient, falling back to one-sided differences
    /// when a probe point leaves the objective's domain (non-finite value).
    fn finite_difference_gradient(
        &self,
        objective: &dyn Fn(&Array1<f64>) -> f64,
        x: &Array1<f64>,
        f_x: f64,
    ) -> Array1<f64> {
        let n = x.len();
        let mut grad = Array1::zeros(n);
        let mut probe = x.clone();

        for i in 0..n {
            let h = self.config.gradient_step * (1.0 + x[i].abs());

            probe[i] = x[i] + h;
            let f_plus = objective(&probe);
            probe[i] = x[i] - h;
            let f_minus = objective(&probe);
            probe[i] = x[i];

            grad[i] = if f_plus.is_finite() && f_minus.is_finite() {
                (f_plus - f_minus) / (2.0 * h)
            } else if f_plus.is_finite() {
                (f_plus - f_x) / h
            } else if f_minus.is_finite() {
                (f_x - f_minus) / h
            } else {
                0.0
            };
        }

        grad
    }

    /// Solve the quadratic subproblem
    ///
    ///   min over feasible z:  g·(z − x) + ½ (z − x)^T B (z − x)
    ///
    /// by projected gradient descent with step 1/L, where L bounds the
    /// spectral radius of B via its infinity norm. Returns d = z − x.
    fn solve_qp_subproblem(
        &self,
        grad: &Array1<f64>,
        hessian: &Array2<f64>,
        x: &Array1<f64>,
        bounds: &WeightBounds,
        budget: f64,
    ) -> Array1<f64> {
        let lipschitz = hessian
            .outer_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(1.0, f64::max);
        let step = 1.0 / lipschitz;

        let mut z = x.clone();
        for _ in 0..self.config.qp_iterations {
            let d = &z - x;
            let qp_grad = grad + &hessian.dot(&d);
            let trial = &z - &qp_grad.mapv(|v| v * step);
            let z_next = project_onto_bounded_simplex(&trial, bounds, budget);

            let shift = (&z_next - &z).mapv(|v| v * v).sum().sqrt();
            z = z_next;
            if shift < 1e-14 {
                break;
            }
        }

        &z - x
    }
}

impl Solver for SlsqpSolver {
    fn minimize(
        &self,
        objective: &dyn Fn(&Array1<f64>) -> f64,
        bounds: &WeightBounds,
        budget: f64,
        start: &Array1<f64>,
    ) -> Result<Solution, SolverError> {
        let n = bounds.len();
        if start.len() != n {
            return Err(SolverError::DimensionMismatch(format!(
                "starting point has {} entries, bounds cover {n} assets",
                start.len()
            )));
        }
        if !bounds.admits_budget(budget, FEASIBILITY_TOL) {
            return Err(SolverError::InfeasibleConstraints(format!(
                "bounds sum to [{:.6}, {:.6}], cannot reach {budget}",
                bounds.lower().sum(),
                bounds.upper().sum()
            )));
        }

        let mut x = project_onto_bounded_simplex(start, bounds, budget);
        let mut f = objective(&x);
        if !f.is_finite() {
            return Err(SolverError::NonFiniteObjective);
        }

        let mut grad = self.finite_difference_gradient(objective, &x, f);
        let mut hessian = Array2::<f64>::eye(n);
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let direction = self.solve_qp_subproblem(&grad, &hessian, &x, bounds, budget);
            let step_norm = direction.dot(&direction).sqrt();
            if step_norm < self.config.step_tol {
                return Ok(Solution {
                    x,
                    objective: f,
                    iterations,
                    converged: true,
                });
            }

            let directional = grad.dot(&direction);

            // Armijo backtracking; the feasible set is convex, so the whole
            // segment [x, x + d] stays feasible.
            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = &x + &direction.mapv(|v| v * alpha);
                let f_candidate = objective(&candidate);
                if f_candidate.is_finite() && f_candidate <= f + ARMIJO_C1 * alpha * directional {
                    accepted = Some((candidate, f_candidate));
                    break;
                }
                alpha *= 0.5;
            }

            let Some((x_next, f_next)) = accepted else {
                // No decrease along the model direction. If the predicted
                // decrease was already below tolerance the iterate is
                // stationary; otherwise the search genuinely stalled.
                let stationary = directional.abs() <= self.config.ftol * (1.0 + f.abs());
                return Ok(Solution {
                    x,
                    objective: f,
                    iterations,
                    converged: stationary,
                });
            };

            let grad_next = self.finite_difference_gradient(objective, &x_next, f_next);
            let s = &x_next - &x;
            let y = &grad_next - &grad;
            bfgs_update(&mut hessian, &s, &y);

            let decrease = f - f_next;
            x = x_next;
            f = f_next;
            grad = grad_next;

            if decrease <= self.config.ftol * (1.0 + f.abs()) {
                return Ok(Solution {
                    x,
                    objective: f,
                    iterations,
                    converged: true,
                });
            }
        }

        Ok(Solution {
            x,
            objective: f,
            iterations,
            converged: false,
        })
    }
}

/// Exact Euclidean projection onto `{ x : Σ x = budget, l ≤ x ≤ u }`
///
/// The projection is `x_i = clip(v_i − λ, l_i, u_i)` for the dual shift λ
/// making the sum hit the budget; `Σ clip(v_i − λ, l_i, u_i)` is
/// nonincreasing in λ, so λ is found by bisection. The bracket endpoints
/// pin the projection at the upper and lower bounds respectively, which
/// straddle the budget whenever the bounds are feasible.
pub fn project_onto_bounded_simplex(
    v: &Array1<f64>,
    bounds: &WeightBounds,
    budget: f64,
) -> Array1<f64> {
    let lower = bounds.lower();
    let upper = bounds.upper();

    let clipped_sum = |lambda: f64| -> f64 {
        v.iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(&vi, (&li, &ui))| (vi - lambda).clamp(li, ui))
            .sum()
    };

    let mut lo = v
        .iter()
        .zip(upper.iter())
        .map(|(&vi, &ui)| vi - ui)
        .fold(f64::INFINITY, f64::min);
    let mut hi = v
        .iter()
        .zip(lower.iter())
        .map(|(&vi, &li)| vi - li)
        .fold(f64::NEG_INFINITY, f64::max);

    for _ in 0..128 {
        let mid = 0.5 * (lo + hi);
        if clipped_sum(mid) > budget {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let lambda = 0.5 * (lo + hi);
    Array1::from_iter(
        v.iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(&vi, (&li, &ui))| (vi - lambda).clamp(li, ui)),
    )
}

/// Damped BFGS update of the Hessian approximation
///
/// Powell damping blends the gradient difference toward `B s` when the
/// curvature along the step is weak, keeping `B` positive definite so the
/// quadratic subproblem stays convex.
fn bfgs_update(b: &mut Array2<f64>, s: &Array1<f64>, y: &Array1<f64>) {
    let bs = b.dot(s);
    let s_bs = s.dot(&bs);
    if s_bs <= 1e-16 {
        return;
    }

    let sy = s.dot(y);
    let theta = if sy < 0.2 * s_bs {
        0.8 * s_bs / (s_bs - sy)
    } else {
        1.0
    };
    let r = y.mapv(|v| v * theta) + bs.mapv(|v| v * (1.0 - theta));
    let sr = s.dot(&r);
    if sr <= 1e-16 {
        return;
    }

    let n = b.nrows();
    for i in 0..n {
        for j in 0..n {
            b[[i, j]] += r[i] * r[j] / sr - bs[i] * bs[j] / s_bs;
        }
    }
}
