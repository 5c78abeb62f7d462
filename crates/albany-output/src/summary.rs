//! Allocation summary for console reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors building an allocation summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Tickers and weights disagree in length
    #[error("Dimension mismatch: {tickers} tickers, {weights} weights")]
    DimensionMismatch {
        /// Number of tickers supplied
        tickers: usize,
        /// Number of weights supplied
        weights: usize,
    },
}

/// A single asset's share of the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetWeight {
    /// Ticker symbol.
    pub ticker: String,

    /// Portfolio weight in [0, 1].
    pub weight: f64,
}

/// Optimal allocation plus its portfolio metrics, ready for reporting.
///
/// Holdings keep the optimizer's asset ordering, so the report lines up
/// with the input ticker list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationSummary {
    /// Per-asset weights in input order.
    pub holdings: Vec<AssetWeight>,

    /// Annualized expected portfolio return.
    pub expected_return: f64,

    /// Annualized portfolio volatility.
    pub volatility: f64,

    /// Sharpe ratio at the reported weights.
    pub sharpe_ratio: f64,
}

impl AllocationSummary {
    /// Build a summary from parallel ticker and weight slices.
    pub fn from_weights(
        tickers: &[String],
        weights: &[f64],
        expected_return: f64,
        volatility: f64,
        sharpe_ratio: f64,
    ) -> Result<Self, SummaryError> {
        if tickers.len() != weights.len() {
            return Err(SummaryError::DimensionMismatch {
                tickers: tickers.len(),
                weights: weights.len(),
            });
        }

        let holdings = tickers
            .iter()
            .zip(weights.iter())
            .map(|(ticker, &weight)| AssetWeight {
                ticker: ticker.clone(),
                weight,
            })
            .collect();

        Ok(Self {
            holdings,
            expected_return,
            volatility,
            sharpe_ratio,
        })
    }
}

impl fmt::Display for AllocationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimal Portfolio Weights:")?;
        for holding in &self.holdings {
            writeln!(f, "  {}: {:.4}", holding.ticker, holding.weight)?;
        }
        writeln!(f)?;
        writeln!(f, "Expected Annual Return: {:.4}", self.expected_return)?;
        writeln!(f, "Expected Volatility: {:.4}", self.volatility)?;
        writeln!(f, "Sharpe Ratio: {:.4}", self.sharpe_ratio)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> AllocationSummary {
        AllocationSummary::from_weights(
            &["SPY".to_string(), "BND".to_string()],
            &[0.6, 0.4],
            0.1234,
            0.1987,
            0.5203,
        )
        .unwrap()
    }

    #[test]
    fn test_from_weights_preserves_order() {
        let summary = sample_summary();
        assert_eq!(summary.holdings[0].ticker, "SPY");
        assert_eq!(summary.holdings[1].ticker, "BND");
        assert_eq!(summary.holdings[1].weight, 0.4);
    }

    #[test]
    fn test_from_weights_length_mismatch() {
        let result = AllocationSummary::from_weights(
            &["SPY".to_string()],
            &[0.6, 0.4],
            0.0,
            0.0,
            0.0,
        );
        assert!(matches!(
            result,
            Err(SummaryError::DimensionMismatch {
                tickers: 1,
                weights: 2
            })
        ));
    }

    #[test]
    fn test_display_report() {
        let report = sample_summary().to_string();
        assert!(report.contains("  SPY: 0.6000"));
        assert!(report.contains("  BND: 0.4000"));
        assert!(report.contains("Expected Annual Return: 0.1234"));
        assert!(report.contains("Expected Volatility: 0.1987"));
        assert!(report.contains("Sharpe Ratio: 0.5203"));
    }
}
