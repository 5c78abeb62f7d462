//! Adjusted close history from Yahoo Finance.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance quote provider with default rate limiting (1 req/sec).
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a new Yahoo Finance quote provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Self {
        Self {
            provider: yahoo::YahooConnector::new().expect("Failed to create Yahoo connector"),
            rate_limit_delay,
        }
    }

    /// Fetch the adjusted close history for a single symbol.
    ///
    /// Adjusted closes fold dividends and splits back into the price, so
    /// log returns computed from them reflect total return.
    ///
    /// # Arguments
    /// * `symbol` - The ticker symbol (e.g., "SPY")
    /// * `start` - Start date for the data
    /// * `end` - End date for the data
    ///
    /// # Returns
    /// A Polars DataFrame with columns: date, adjusted_close
    pub async fn fetch_adjusted_close(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        // Convert chrono DateTime to time::OffsetDateTime
        let start_time = time::OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;
        let end_time = time::OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;

        let response = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = DataFrame::new(vec![
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        // Convert timestamp to date
        let df = df
            .lazy()
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[col("date"), col("adjusted_close")])
            .sort(["date"], SortMultipleOptions::default())
            .collect()?;

        // Apply rate limiting
        sleep(self.rate_limit_delay).await;

        Ok(df)
    }
}

impl Default for YahooQuoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble per-symbol adjusted close frames into one price frame.
///
/// Each input is a `(ticker, frame)` pair as produced by
/// [`YahooQuoteProvider::fetch_adjusted_close`]. The output has a `date`
/// column plus one column per ticker, in input order, inner-joined on date
/// so only dates quoted for every ticker survive.
pub fn assemble_price_frame(frames: Vec<(String, DataFrame)>) -> Result<DataFrame> {
    let mut iter = frames.into_iter();
    let Some((first_symbol, first)) = iter.next() else {
        return Err(DataError::MissingData {
            symbol: "*".to_string(),
            reason: "No symbols to assemble".to_string(),
        });
    };

    let mut combined = first
        .lazy()
        .select(&[col("date"), col("adjusted_close").alias(first_symbol.as_str())]);

    for (symbol, frame) in iter {
        let prices = frame
            .lazy()
            .select(&[col("date"), col("adjusted_close").alias(symbol.as_str())]);
        combined = combined.join(
            prices,
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Inner),
        );
    }

    let df = combined
        .sort(["date"], SortMultipleOptions::default())
        .collect()?;
    Ok(df)
}
