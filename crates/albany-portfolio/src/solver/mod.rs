//! Constrained solver seam
//!
//! The optimizer talks to its numeric solver through the [`Solver`] trait:
//! given an objective, per-asset box bounds, a budget (the required sum of
//! the components) and a feasible starting point, a solver returns a
//! candidate plus its convergence status. Alternative solvers can be
//! substituted without touching the portfolio metrics or the risk model.

pub mod slsqp;

use ndarray::Array1;
use thiserror::Error;

/// Errors from constrained solvers
#[derive(Debug, Error)]
pub enum SolverError {
    /// The bounds admit no vector summing to the budget
    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    /// Dimension mismatch between bounds and starting point
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The objective is not finite at the (feasible) starting point
    #[error("Objective is not finite at the starting point")]
    NonFiniteObjective,

    /// Invalid solver parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Per-asset lower and upper weight bounds
///
/// Index `i` bounds the same asset as column `i` of the return matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl WeightBounds {
    /// Uniform bounds: the same `[lower, upper]` interval for all `n` assets
    pub fn uniform(n: usize, lower: f64, upper: f64) -> Result<Self, SolverError> {
        Self::per_asset(Array1::from_elem(n, lower), Array1::from_elem(n, upper))
    }

    /// Per-asset bounds
    pub fn per_asset(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self, SolverError> {
        if lower.len() != upper.len() {
            return Err(SolverError::DimensionMismatch(format!(
                "lower bounds have {} entries, upper bounds {}",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() {
            return Err(SolverError::InvalidParameter(
                "bounds must cover at least one asset".to_string(),
            ));
        }
        for (i, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if !l.is_finite() || !u.is_finite() {
                return Err(SolverError::InvalidParameter(format!(
                    "non-finite bound for asset {i}"
                )));
            }
            if l > u {
                return Err(SolverError::InvalidParameter(format!(
                    "lower bound {l} exceeds upper bound {u} for asset {i}"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Number of assets covered by these bounds
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether the bounds cover no assets (never true for a constructed value)
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower bound vector
    pub const fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper bound vector
    pub const fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Whether some vector within the bounds can sum to `budget`
    ///
    /// Fails exactly when `Σ lower > budget` or `Σ upper < budget`, with a
    /// `tol` slack so exactly-tight bounds (e.g. five assets capped at 0.2)
    /// remain feasible.
    pub fn admits_budget(&self, budget: f64, tol: f64) -> bool {
        self.lower.sum() <= budget + tol && self.upper.sum() >= budget - tol
    }
}

/// Solver result: candidate point plus convergence status
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final iterate
    pub x: Array1<f64>,
    /// Objective value at the final iterate
    pub objective: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the convergence tolerance was met within the iteration cap
    pub converged: bool,
}

/// Trait for smooth constrained minimizers over a budgeted box
///
/// The feasible set is `{ x : Σ x = budget, lower_i ≤ x_i ≤ upper_i }`.
pub trait Solver {
    /// Minimize `objective` over the feasible set, starting from `start`
    ///
    /// Implementations must be deterministic: the same inputs and starting
    /// point yield the same solution. A non-converged candidate is returned
    /// with `converged == false`, never silently as a success.
    fn minimize(
        &self,
        objective: &dyn Fn(&Array1<f64>) -> f64,
        bounds: &WeightBounds,
        budget: f64,
        start: &Array1<f64>,
    ) -> Result<Solution, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_bounds() {
        let bounds = WeightBounds::uniform(3, 0.0, 0.4).unwrap();
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds.lower()[1], 0.0);
        assert_eq!(bounds.upper()[2], 0.4);
    }

    #[test]
    fn test_crossed_bounds_rejected() {
        assert!(WeightBounds::uniform(2, 0.5, 0.4).is_err());
    }

    #[test]
    fn test_empty_bounds_rejected() {
        assert!(WeightBounds::uniform(0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_mismatched_bound_lengths_rejected() {
        let lower = Array1::zeros(2);
        let upper = Array1::from_elem(3, 1.0);
        assert!(WeightBounds::per_asset(lower, upper).is_err());
    }

    #[test]
    fn test_admits_budget() {
        // 3 assets capped at 0.2 can reach at most 0.6 < 1
        let tight = WeightBounds::uniform(3, 0.0, 0.2).unwrap();
        assert!(!tight.admits_budget(1.0, 1e-9));

        // 5 assets capped at 0.2 sum to exactly 1
        let exact = WeightBounds::uniform(5, 0.0, 0.2).unwrap();
        assert!(exact.admits_budget(1.0, 1e-9));

        // floors exceeding the budget are infeasible too
        let floored = WeightBounds::uniform(4, 0.3, 1.0).unwrap();
        assert!(!floored.admits_budget(1.0, 1e-9));
    }
}
