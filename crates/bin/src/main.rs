//! Albany CLI binary.
//!
//! Fetches adjusted close histories, builds the log-return series,
//! estimates the annualized covariance matrix and solves for the
//! Sharpe-optimal allocation under per-asset weight bounds.

use albany_data::{YahooQuoteProvider, assemble_price_frame, log_returns};
use albany_output::{AllocationSummary, ExportFormat, Exporter};
use albany_portfolio::{MeanVarianceOptimizer, OptimizerConfig, WeightBounds};
use albany_risk::{CovarianceEstimator, SampleCovarianceEstimator};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "albany")]
#[command(about = "Albany: constrained Sharpe-ratio portfolio optimizer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize portfolio weights over historical returns
    Optimize {
        /// Comma-separated ticker symbols
        #[arg(long, default_value = "SPY,BND,GLD,QQQ,VTI")]
        symbols: String,

        /// History window in years
        #[arg(long, default_value = "8")]
        years: u32,

        /// Annualized risk-free rate
        #[arg(long, default_value = "0.02")]
        risk_free_rate: f64,

        /// Minimum weight per asset
        #[arg(long, default_value = "0.0")]
        min_weight: f64,

        /// Maximum weight per asset
        #[arg(long, default_value = "0.4")]
        max_weight: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the allocation to a file (.csv for weights, .json for the
        /// full summary)
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            symbols,
            years,
            risk_free_rate,
            min_weight,
            max_weight,
            format,
            export,
        } => {
            optimize(
                &symbols,
                years,
                risk_free_rate,
                min_weight,
                max_weight,
                &format,
                export.as_deref(),
            )
            .await
        }
    }
}

async fn optimize(
    symbols: &str,
    years: u32,
    risk_free_rate: f64,
    min_weight: f64,
    max_weight: f64,
    format: &str,
    export: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let symbols: Vec<String> = symbols
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err("no symbols given".into());
    }

    let end = Utc::now();
    let start = end - Duration::days(i64::from(years) * 365);

    let provider = YahooQuoteProvider::new();
    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut frames = Vec::new();
    for symbol in &symbols {
        pb.set_message(symbol.clone());
        match provider.fetch_adjusted_close(symbol, start, end).await {
            Ok(frame) => frames.push((symbol.clone(), frame)),
            Err(e) => eprintln!("Warning: Failed to fetch data for {}: {}", symbol, e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let prices = assemble_price_frame(frames)?;
    let series = log_returns(&prices)?;
    let covariance = SampleCovarianceEstimator::try_default()?.estimate(&series.returns)?;

    let bounds = WeightBounds::uniform(series.n_assets(), min_weight, max_weight)?;
    let mut config = OptimizerConfig::new(bounds);
    config.risk_free_rate = risk_free_rate;

    let optimizer = MeanVarianceOptimizer::new(config);
    let portfolio = optimizer.optimize(&series.returns, &covariance)?;

    let summary = AllocationSummary::from_weights(
        &series.tickers,
        &portfolio.weights.to_vec(),
        portfolio.expected_return,
        portfolio.volatility,
        portfolio.sharpe_ratio,
    )?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    if let Some(path) = export {
        summary.export_to_file(path, ExportFormat::from_path(path))?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}
