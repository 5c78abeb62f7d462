#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/albany/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod metrics;
pub mod optimizer;
pub mod solver;

// Re-export main types
pub use metrics::{MetricsError, expected_return, sharpe_ratio, volatility};
pub use optimizer::{MeanVarianceOptimizer, OptimalPortfolio, OptimizerConfig, OptimizerError};
pub use solver::{Solution, Solver, SolverError, WeightBounds};
pub use solver::slsqp::{SlsqpConfig, SlsqpSolver};
