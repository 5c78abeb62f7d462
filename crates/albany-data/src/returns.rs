//! Log-return matrix construction.
//!
//! Converts a date × ticker price frame into the periodic log-return
//! matrix the risk model and optimizer consume. A period's return for
//! asset i is `ln(p_t / p_{t-1})`; the first period has no predecessor
//! and is dropped. Any period with a missing or non-positive price for
//! any asset is dropped entirely, so the matrix is row-complete and the
//! asset columns stay aligned.

use crate::error::{DataError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Ordered tickers plus their periodic log-return matrix.
///
/// Column `i` of `returns` belongs to `tickers[i]`; rows are periods in
/// chronological order, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    /// Asset tickers in matrix column order
    pub tickers: Vec<String>,
    /// Periods × assets log returns
    pub returns: Array2<f64>,
}

impl ReturnSeries {
    /// Number of return periods (rows)
    pub fn n_periods(&self) -> usize {
        self.returns.nrows()
    }

    /// Number of assets (columns)
    pub fn n_assets(&self) -> usize {
        self.returns.ncols()
    }
}

/// Build the log-return series from a price frame.
///
/// Every column other than `date` is treated as an asset price series, in
/// frame order. Requires at least three complete price rows (two return
/// periods) so the sample covariance downstream is defined.
pub fn log_returns(prices: &DataFrame) -> Result<ReturnSeries> {
    let tickers: Vec<String> = prices
        .get_column_names_str()
        .into_iter()
        .filter(|name| *name != "date")
        .map(|name| name.to_string())
        .collect();

    if tickers.is_empty() {
        return Err(DataError::MissingData {
            symbol: "*".to_string(),
            reason: "price frame has no asset columns".to_string(),
        });
    }

    let n_assets = tickers.len();
    let height = prices.height();

    let mut columns = Vec::with_capacity(n_assets);
    for ticker in &tickers {
        let values: Vec<Option<f64>> = prices
            .column(ticker)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        columns.push(values);
    }

    let mut data = Vec::new();
    let mut n_periods = 0;
    for t in 1..height {
        let mut row = Vec::with_capacity(n_assets);
        let mut complete = true;
        for column in &columns {
            match (column[t - 1], column[t]) {
                (Some(prev), Some(cur))
                    if prev > 0.0 && cur > 0.0 && prev.is_finite() && cur.is_finite() =>
                {
                    row.push((cur / prev).ln());
                }
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            data.extend(row);
            n_periods += 1;
        }
    }

    if n_periods < 2 {
        return Err(DataError::InsufficientHistory {
            required: 2,
            actual: n_periods,
        });
    }

    let returns = Array2::from_shape_vec((n_periods, n_assets), data)
        .expect("row-complete data matches the period x asset shape");

    Ok(ReturnSeries { tickers, returns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(columns: Vec<(&str, Vec<Option<f64>>)>) -> DataFrame {
        let height = columns[0].1.len();
        let dates: Vec<i32> = (0..height as i32).collect();
        let mut series: Vec<Column> = vec![
            Series::new("date".into(), dates)
                .cast(&DataType::Date)
                .unwrap()
                .into(),
        ];
        for (name, values) in columns {
            series.push(Series::new(name.into(), values).into());
        }
        DataFrame::new(series).unwrap()
    }

    #[test]
    fn test_log_returns_hand_computed() {
        let prices = frame(vec![
            ("SPY", vec![Some(100.0), Some(110.0), Some(99.0)]),
            ("BND", vec![Some(80.0), Some(80.0), Some(84.0)]),
        ]);

        let series = log_returns(&prices).unwrap();
        assert_eq!(series.tickers, vec!["SPY", "BND"]);
        assert_eq!(series.n_periods(), 2);
        assert_eq!(series.n_assets(), 2);

        assert_relative_eq!(series.returns[[0, 0]], (110.0_f64 / 100.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(series.returns[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(series.returns[[1, 0]], (99.0_f64 / 110.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(series.returns[[1, 1]], (84.0_f64 / 80.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_incomplete_periods_dropped() {
        // BND has no price in the middle period: both returns touching it
        // are dropped, for every asset.
        let prices = frame(vec![
            ("SPY", vec![Some(100.0), Some(101.0), Some(102.0), Some(103.0), Some(104.0)]),
            ("BND", vec![Some(80.0), Some(81.0), None, Some(82.0), Some(83.0)]),
        ]);

        let series = log_returns(&prices).unwrap();
        assert_eq!(series.n_periods(), 2);
        assert_relative_eq!(series.returns[[0, 0]], (101.0_f64 / 100.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(series.returns[[1, 0]], (104.0_f64 / 103.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_complete_periods() {
        let prices = frame(vec![("SPY", vec![Some(100.0), Some(101.0)])]);
        assert!(matches!(
            log_returns(&prices),
            Err(DataError::InsufficientHistory {
                required: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_non_positive_prices_dropped() {
        let prices = frame(vec![(
            "SPY",
            vec![Some(100.0), Some(0.0), Some(102.0), Some(103.0), Some(104.0)],
        )]);

        let series = log_returns(&prices).unwrap();
        // returns touching the zero price are gone
        assert_eq!(series.n_periods(), 2);
    }

    #[test]
    fn test_column_order_preserved() {
        let prices = frame(vec![
            ("QQQ", vec![Some(1.0), Some(2.0), Some(3.0)]),
            ("GLD", vec![Some(4.0), Some(5.0), Some(6.0)]),
            ("VTI", vec![Some(7.0), Some(8.0), Some(9.0)]),
        ]);
        let series = log_returns(&prices).unwrap();
        assert_eq!(series.tickers, vec!["QQQ", "GLD", "VTI"]);
    }
}
