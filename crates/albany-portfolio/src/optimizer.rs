//! Constrained Sharpe-ratio optimizer
//!
//! Front-end of the crate: validates inputs, builds the negative-Sharpe
//! objective over the log-return and covariance matrices, and runs a
//! [`Solver`] over the feasible set `{ w : Σ w = 1, lower ≤ w ≤ upper }`
//! from a uniform 1/N starting point. The reported expected return,
//! volatility and Sharpe ratio are recomputed through the metric functions
//! at the final weights, never read from solver internals, so they always
//! agree with the reported allocation.

use crate::metrics::{self, MetricsError};
use crate::solver::slsqp::SlsqpSolver;
use crate::solver::{Solver, SolverError, WeightBounds};
use albany_risk::zero_variance_asset;
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Diagonal entries below this are treated as zero variance
const ZERO_VARIANCE_TOL: f64 = 1e-12;

/// Slack for the bounds-versus-budget feasibility check
const FEASIBILITY_TOL: f64 = 1e-9;

/// Optimizer errors
///
/// Every failure is surfaced as an error; no partial or unconverged weight
/// vector is ever returned.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Too little history, or an asset with zero variance
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Bounds and the sum-to-one constraint cannot both hold
    #[error("Infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    /// The solver exhausted its iteration budget without converging
    #[error("Solver did not converge within {iterations} iterations")]
    NonConvergence {
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// Volatility is zero or non-finite at an evaluated weight vector
    #[error("Degenerate volatility at candidate weights")]
    DegenerateVolatility,

    /// Returns, covariance and bounds disagree on the number of assets
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid optimizer or solver configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<SolverError> for OptimizerError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::InfeasibleConstraints(msg) => Self::InfeasibleConstraints(msg),
            SolverError::DimensionMismatch(msg) => Self::DimensionMismatch(msg),
            SolverError::NonFiniteObjective => Self::DegenerateVolatility,
            SolverError::InvalidParameter(msg) => Self::InvalidConfig(msg),
        }
    }
}

impl From<MetricsError> for OptimizerError {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::DimensionMismatch { expected, actual } => Self::DimensionMismatch(
                format!("expected {expected} assets, got {actual}"),
            ),
            MetricsError::DegenerateVolatility(_) => Self::DegenerateVolatility,
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Annualized risk-free rate (default: 0.02)
    pub risk_free_rate: f64,

    /// Trading periods per year, matching the covariance annualization
    /// (default: 252)
    pub periods_per_year: f64,

    /// Per-asset weight bounds
    pub bounds: WeightBounds,
}

impl OptimizerConfig {
    /// Configuration with the given bounds and default rate/annualization
    pub const fn new(bounds: WeightBounds) -> Self {
        Self {
            risk_free_rate: 0.02,
            periods_per_year: 252.0,
            bounds,
        }
    }
}

/// Optimal allocation plus its metrics, all evaluated at the same weights
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalPortfolio {
    /// Optimal weight vector, aligned to the input asset ordering
    pub weights: Array1<f64>,
    /// Annualized expected return at the optimal weights
    pub expected_return: f64,
    /// Annualized volatility at the optimal weights
    pub volatility: f64,
    /// Sharpe ratio at the optimal weights
    pub sharpe_ratio: f64,
}

/// Mean-variance optimizer maximizing the Sharpe ratio
///
/// Generic over the [`Solver`] so alternative numeric methods can be
/// plugged in; defaults to [`SlsqpSolver`].
#[derive(Debug)]
pub struct MeanVarianceOptimizer<S = SlsqpSolver> {
    config: OptimizerConfig,
    solver: S,
}

impl MeanVarianceOptimizer<SlsqpSolver> {
    /// Create an optimizer with the default SLSQP solver
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_solver(config, SlsqpSolver::default())
    }
}

impl<S: Solver> MeanVarianceOptimizer<S> {
    /// Create an optimizer with a custom solver
    pub const fn with_solver(config: OptimizerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    /// Find the in-bounds, fully-invested weights maximizing the Sharpe ratio
    ///
    /// # Arguments
    /// * `asset_returns` - Periodic log returns, rows = periods (oldest
    ///   first), columns = assets
    /// * `covariance` - Annualized covariance matrix over the same assets
    ///   in the same order
    pub fn optimize(
        &self,
        asset_returns: &Array2<f64>,
        covariance: &Array2<f64>,
    ) -> Result<OptimalPortfolio, OptimizerError> {
        let (n_periods, n_assets) = asset_returns.dim();

        if n_assets == 0 {
            return Err(OptimizerError::DimensionMismatch(
                "return matrix has no asset columns".to_string(),
            ));
        }
        if covariance.nrows() != n_assets || covariance.ncols() != n_assets {
            return Err(OptimizerError::DimensionMismatch(format!(
                "covariance is {}x{}, returns cover {n_assets} assets",
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        if self.config.bounds.len() != n_assets {
            return Err(OptimizerError::DimensionMismatch(format!(
                "bounds cover {} assets, returns cover {n_assets}",
                self.config.bounds.len()
            )));
        }
        if n_periods < 2 {
            return Err(OptimizerError::InsufficientData(format!(
                "need at least 2 return periods, got {n_periods}"
            )));
        }
        if let Some(i) = zero_variance_asset(covariance, ZERO_VARIANCE_TOL) {
            return Err(OptimizerError::InsufficientData(format!(
                "asset {i} has zero variance"
            )));
        }
        if !self.config.bounds.admits_budget(1.0, FEASIBILITY_TOL) {
            return Err(OptimizerError::InfeasibleConstraints(format!(
                "bounds sum to [{:.6}, {:.6}], cannot reach 1",
                self.config.bounds.lower().sum(),
                self.config.bounds.upper().sum()
            )));
        }

        let risk_free_rate = self.config.risk_free_rate;
        let periods_per_year = self.config.periods_per_year;

        // Maximizing the Sharpe ratio == minimizing its negation. Weight
        // vectors where the ratio is undefined are worst-possible, so the
        // line search backs away from them.
        let objective = |w: &Array1<f64>| {
            metrics::sharpe_ratio(w, asset_returns, covariance, risk_free_rate, periods_per_year)
                .map_or(f64::INFINITY, |s| -s)
        };

        // Uniform 1/N start; the solver projects it onto the feasible set
        // when 1/N violates a bound.
        let start = Array1::from_elem(n_assets, 1.0 / n_assets as f64);
        let solution = self
            .solver
            .minimize(&objective, &self.config.bounds, 1.0, &start)?;

        if !solution.converged {
            return Err(OptimizerError::NonConvergence {
                iterations: solution.iterations,
            });
        }

        let weights = solution.x;
        let expected_return = metrics::expected_return(&weights, asset_returns, periods_per_year)?;
        let volatility = metrics::volatility(&weights, covariance)?;
        let sharpe_ratio = metrics::sharpe_ratio(
            &weights,
            asset_returns,
            covariance,
            risk_free_rate,
            periods_per_year,
        )?;

        Ok(OptimalPortfolio {
            weights,
            expected_return,
            volatility,
            sharpe_ratio,
        })
    }
}
