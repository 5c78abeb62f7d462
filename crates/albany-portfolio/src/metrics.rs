//! Portfolio metrics
//!
//! Pure functions over a candidate weight vector, a log-return matrix and
//! an annualized covariance matrix, all sharing one asset ordering:
//!
//! - expected return: E[R_p] = (periods/year) * Σ_i w_i * mean_i(returns)
//! - volatility:      σ_p = sqrt(w^T * Σ * w)
//! - Sharpe ratio:    (E[R_p] - r_f) / σ_p
//!
//! Every input is an explicit argument; nothing is read from enclosing
//! scope, so the weights, returns and covariance in a result are always
//! the ones the caller passed in.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors from portfolio metric computations
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Dimension mismatch between weights and returns/covariance
    #[error("Dimension mismatch: expected {expected} assets, got {actual}")]
    DimensionMismatch {
        /// Expected number of assets
        expected: usize,
        /// Actual number of assets
        actual: usize,
    },

    /// Volatility is zero or not finite, leaving the Sharpe ratio undefined
    #[error("Degenerate volatility: {0}")]
    DegenerateVolatility(f64),
}

/// Annualized expected portfolio return
///
/// Weighted sum of per-asset mean periodic log returns, annualized by
/// `periods_per_year`. Assumes i.i.d. periodic log returns.
pub fn expected_return(
    weights: &Array1<f64>,
    asset_returns: &Array2<f64>,
    periods_per_year: f64,
) -> Result<f64, MetricsError> {
    let (n_periods, n_assets) = asset_returns.dim();
    if weights.len() != n_assets {
        return Err(MetricsError::DimensionMismatch {
            expected: n_assets,
            actual: weights.len(),
        });
    }

    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        let mean = asset_returns.column(i).sum() / n_periods as f64;
        acc += w * mean;
    }

    Ok(acc * periods_per_year)
}

/// Portfolio volatility (standard deviation)
///
/// Square root of the quadratic form w^T * Σ * w. The form is clamped at
/// zero before the square root: a near-singular covariance matrix can
/// produce a slightly negative value through rounding, which must not turn
/// into a NaN.
pub fn volatility(weights: &Array1<f64>, covariance: &Array2<f64>) -> Result<f64, MetricsError> {
    let n = weights.len();
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(MetricsError::DimensionMismatch {
            expected: n,
            actual: covariance.nrows(),
        });
    }

    let variance = weights.dot(&covariance.dot(weights));
    Ok(variance.max(0.0).sqrt())
}

/// Sharpe ratio of the portfolio
///
/// Annualized excess return per unit of volatility. `risk_free_rate` must
/// be in the same (annualized) units as the expected return. Zero or
/// non-finite volatility leaves the ratio undefined and is reported as
/// [`MetricsError::DegenerateVolatility`] rather than dividing through.
pub fn sharpe_ratio(
    weights: &Array1<f64>,
    asset_returns: &Array2<f64>,
    covariance: &Array2<f64>,
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<f64, MetricsError> {
    let ret = expected_return(weights, asset_returns, periods_per_year)?;
    let vol = volatility(weights, covariance)?;

    if vol <= 0.0 || !vol.is_finite() {
        return Err(MetricsError::DegenerateVolatility(vol));
    }

    Ok((ret - risk_free_rate) / vol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn test_expected_return_hand_computed() {
        // Column means: [0.001, 0.002]
        let returns = array![[0.000, 0.001], [0.002, 0.003]];
        let weights = array![0.25, 0.75];
        let er = expected_return(&weights, &returns, 252.0).unwrap();
        // 252 * (0.25 * 0.001 + 0.75 * 0.002) = 252 * 0.00175
        assert_relative_eq!(er, 0.441, epsilon = 1e-12);
    }

    #[test]
    fn test_expected_return_dimension_mismatch() {
        let returns = array![[0.0, 0.001], [0.002, 0.003]];
        let weights = array![1.0];
        assert!(matches!(
            expected_return(&weights, &returns, 252.0),
            Err(MetricsError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_volatility_hand_computed() {
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let weights = array![0.5, 0.5];
        let vol = volatility(&weights, &cov).unwrap();
        // w'Σw = 0.25*0.04 + 0.25*0.09 + 2*0.25*0.01 = 0.0375
        assert_relative_eq!(vol, 0.0375_f64.sqrt(), epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.25)]
    #[case(0.5)]
    #[case(0.75)]
    #[case(1.0)]
    fn test_volatility_nonnegative_in_bounds(#[case] w0: f64) {
        // Property: for in-bounds weight vectors on a well-conditioned
        // matrix the volatility is finite and >= 0.
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let weights = array![w0, 1.0 - w0];
        let vol = volatility(&weights, &cov).unwrap();
        assert!(vol.is_finite());
        assert!(vol >= 0.0);
    }

    #[test]
    fn test_volatility_clamps_negative_quadratic_form() {
        // A rounding-corrupted "covariance" whose quadratic form goes
        // slightly negative must yield 0, not NaN.
        let cov = array![[1e-18, -1e-12], [-1e-12, 1e-18]];
        let weights = array![0.5, 0.5];
        let vol = volatility(&weights, &cov).unwrap();
        assert_eq!(vol, 0.0);
    }

    #[test]
    fn test_sharpe_ratio_hand_computed() {
        let returns = array![[0.000, 0.001], [0.002, 0.003]];
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let weights = array![0.5, 0.5];

        let er = expected_return(&weights, &returns, 252.0).unwrap();
        let vol = volatility(&weights, &cov).unwrap();
        let sharpe = sharpe_ratio(&weights, &returns, &cov, 0.02, 252.0).unwrap();

        assert_relative_eq!(sharpe, (er - 0.02) / vol, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_ratio_degenerate_volatility() {
        let returns = array![[0.001, 0.001], [0.001, 0.001]];
        let cov = array![[0.0, 0.0], [0.0, 0.0]];
        let weights = array![0.5, 0.5];
        assert!(matches!(
            sharpe_ratio(&weights, &returns, &cov, 0.02, 252.0),
            Err(MetricsError::DegenerateVolatility(_))
        ));
    }

    #[test]
    fn test_sharpe_ratio_annualization_consistency() {
        // Annualizing the periodic covariance by periods-per-year and the
        // returns by the same factor must give the same ratio as passing
        // pre-annualized inputs directly.
        let returns = array![[0.01, -0.002], [0.003, 0.004], [-0.001, 0.002]];
        let weights = array![0.6, 0.4];
        let ppy = 252.0;

        let periodic_cov = array![[2.0e-4, 0.4e-4], [0.4e-4, 1.1e-4]];
        let annual_cov = periodic_cov.mapv(|v| v * ppy);

        let sharpe = sharpe_ratio(&weights, &returns, &annual_cov, 0.02, ppy).unwrap();

        let er_annual = expected_return(&weights, &returns, ppy).unwrap();
        let vol_annual = volatility(&weights, &periodic_cov).unwrap() * ppy.sqrt();
        let expected = (er_annual - 0.02) / vol_annual;

        assert_relative_eq!(sharpe, expected, epsilon = 1e-10);
    }
}
