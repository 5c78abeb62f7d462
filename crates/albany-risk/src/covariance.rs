//! Annualized sample covariance estimation
//!
//! The covariance matrix is the risk input of the mean-variance optimizer:
//! portfolio variance is the quadratic form w^T * Σ * w. Periodic log
//! returns are assumed i.i.d., so the periodic sample covariance is
//! annualized by multiplying with the number of trading periods per year:
//!
//! Σ_annual(i,j) = (periods/year) * (1/(T-1)) * Σ_t (r_{t,i} - μ_i)(r_{t,j} - μ_j)

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
///
/// The asset ordering of the output matches the column ordering of the
/// input: row/column `i` of the estimate corresponds to asset column `i`
/// of the return matrix.
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `asset_returns` - Matrix where each row is a time period and each column is an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, asset_returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}

/// Sample covariance estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCovarianceConfig {
    /// Annualization factor: trading periods per year (default: 252)
    pub periods_per_year: f64,

    /// Minimum number of observations required (default: 2)
    pub min_periods: usize,
}

impl Default for SampleCovarianceConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            min_periods: 2,
        }
    }
}

/// Annualized sample covariance estimator
#[derive(Debug)]
pub struct SampleCovarianceEstimator {
    config: SampleCovarianceConfig,
}

impl SampleCovarianceEstimator {
    /// Create a new sample covariance estimator with the given configuration
    pub fn new(config: SampleCovarianceConfig) -> Result<Self, CovarianceError> {
        if !config.periods_per_year.is_finite() || config.periods_per_year <= 0.0 {
            return Err(CovarianceError::InvalidParameter(format!(
                "periods_per_year must be positive, got {}",
                config.periods_per_year
            )));
        }
        if config.min_periods < 2 {
            return Err(CovarianceError::InvalidParameter(format!(
                "min_periods must be at least 2, got {}",
                config.min_periods
            )));
        }
        Ok(Self { config })
    }

    /// Create with default configuration.
    ///
    /// # Errors
    /// Returns an error if the default configuration is invalid (should not happen).
    pub fn try_default() -> Result<Self, CovarianceError> {
        Self::new(SampleCovarianceConfig::default())
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, asset_returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let (n_periods, n_assets) = asset_returns.dim();

        if n_periods < self.config.min_periods {
            return Err(CovarianceError::InsufficientData {
                required: self.config.min_periods,
                actual: n_periods,
            });
        }

        // Column means for demeaning
        let means: Vec<f64> = (0..n_assets)
            .map(|i| asset_returns.column(i).sum() / n_periods as f64)
            .collect();

        let mut cov = Array2::<f64>::zeros((n_assets, n_assets));
        let denom = (n_periods - 1) as f64;
        let scale = self.config.periods_per_year / denom;

        // Upper triangle, mirrored so the output is symmetric by construction
        for i in 0..n_assets {
            for j in i..n_assets {
                let mut acc = 0.0;
                for t in 0..n_periods {
                    acc += (asset_returns[[t, i]] - means[i]) * (asset_returns[[t, j]] - means[j]);
                }
                let value = acc * scale;
                cov[[i, j]] = value;
                cov[[j, i]] = value;
            }
        }

        Ok(cov)
    }
}

/// Find the first asset with (numerically) zero variance
///
/// Returns the index of the first diagonal entry of `cov` below `tol`,
/// or `None` if every asset carries variance. A zero-variance asset makes
/// volatility and the Sharpe ratio undefined for portfolios concentrated
/// in it, so callers should reject such inputs before optimizing.
pub fn zero_variance_asset(cov: &Array2<f64>, tol: f64) -> Option<usize> {
    (0..cov.nrows().min(cov.ncols())).find(|&i| cov[[i, i]] < tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn periodic_estimator() -> SampleCovarianceEstimator {
        // periods_per_year = 1 gives the raw sample covariance
        SampleCovarianceEstimator::new(SampleCovarianceConfig {
            periods_per_year: 1.0,
            min_periods: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = SampleCovarianceConfig::default();
        assert_eq!(config.periods_per_year, 252.0);
        assert_eq!(config.min_periods, 2);
    }

    #[test]
    fn test_invalid_periods_per_year() {
        let config = SampleCovarianceConfig {
            periods_per_year: 0.0,
            ..Default::default()
        };
        assert!(SampleCovarianceEstimator::new(config).is_err());
    }

    #[test]
    fn test_invalid_min_periods() {
        let config = SampleCovarianceConfig {
            min_periods: 1,
            ..Default::default()
        };
        assert!(SampleCovarianceEstimator::new(config).is_err());
    }

    #[test]
    fn test_insufficient_data() {
        let estimator = SampleCovarianceEstimator::try_default().unwrap();
        let returns = array![[0.01, 0.02]]; // single period
        let err = estimator.estimate(&returns).unwrap_err();
        assert!(matches!(
            err,
            CovarianceError::InsufficientData {
                required: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_hand_computed_covariance() {
        // Two assets, three periods; sample covariance computed by hand
        // with the n-1 denominator.
        let returns = array![[0.01, 0.02], [0.03, -0.01], [0.02, 0.05]];
        let cov = periodic_estimator().estimate(&returns).unwrap();

        // means: [0.02, 0.02]
        // var_0 = (1e-4 + 1e-4 + 0) / 2 = 1e-4
        // var_1 = (0 + 9e-4 + 9e-4) / 2 = 9e-4
        // cov_01 = ((-0.01)(0.0) + (0.01)(-0.03) + (0.0)(0.03)) / 2 = -1.5e-4
        assert_relative_eq!(cov[[0, 0]], 1.0e-4, epsilon = 1e-12);
        assert_relative_eq!(cov[[1, 1]], 9.0e-4, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 1]], -1.5e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_annualization_scales_linearly() {
        let returns = array![[0.01, 0.02], [0.03, -0.01], [0.02, 0.05]];
        let periodic = periodic_estimator().estimate(&returns).unwrap();
        let annual = SampleCovarianceEstimator::try_default()
            .unwrap()
            .estimate(&returns)
            .unwrap();

        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(annual[[i, j]], 252.0 * periodic[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_symmetry() {
        let returns = array![
            [0.011, -0.002, 0.004],
            [-0.007, 0.009, 0.001],
            [0.003, 0.004, -0.006],
            [0.008, -0.001, 0.002]
        ];
        let cov = SampleCovarianceEstimator::try_default()
            .unwrap()
            .estimate(&returns)
            .unwrap();

        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(cov[[i, j]], cov[[j, i]]);
            }
        }
    }

    #[test]
    fn test_single_asset_does_not_panic() {
        let returns = array![[0.01], [0.02], [0.03]];
        let cov = periodic_estimator().estimate(&returns).unwrap();
        assert_eq!(cov.dim(), (1, 1));
        assert_relative_eq!(cov[[0, 0]], 1.0e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_detection() {
        let returns = array![[0.01, 0.005], [0.02, 0.005], [0.03, 0.005]];
        let cov = periodic_estimator().estimate(&returns).unwrap();
        assert_eq!(zero_variance_asset(&cov, 1e-12), Some(1));

        let healthy = array![[0.01, 0.004], [0.02, 0.009], [0.03, 0.002]];
        let cov = periodic_estimator().estimate(&healthy).unwrap();
        assert_eq!(zero_variance_asset(&cov, 1e-12), None);
    }
}
