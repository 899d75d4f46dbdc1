//! tickerlens CLI: run, batch, and cache management commands.
//!
//! Commands:
//! - `run`: process one ticker and write its JSON record
//! - `batch`: process many tickers, one JSON record each
//! - `cache status`: report cached price history per ticker

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickerlens_core::data::PriceCache;
use tickerlens_runner::runner::{BatchSummary, TickerRun};
use tickerlens_runner::{
    init_logging, normalize_ticker, run_batch, run_ticker, AppConfig, MetricsStore, RunContext,
    RunFlags,
};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "tickerlens",
    about = "tickerlens: per-ticker price and fundamentals analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one ticker and write its output record.
    Run {
        /// Ticker symbol (e.g., AAPL, RELIANCE).
        #[arg(long)]
        ticker: String,

        /// Output JSON path.
        #[arg(long, default_value = "output.json")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Process several tickers, writing `{output_dir}/{TICKER}.json` for each.
    Batch {
        /// Ticker symbols.
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Output directory for the JSON records.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data instead of the configured provider.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached date range and row count per ticker.
    Status {
        /// Ticker symbols to report.
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Path to a TOML config file; supplies the symbol suffix.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            ticker,
            output,
            common,
        } => run_cmd(&ticker, &output, &common),
        Commands::Batch {
            tickers,
            output_dir,
            common,
        } => batch_cmd(&tickers, &output_dir, &common),
        Commands::Cache { action } => match action {
            CacheAction::Status {
                tickers,
                cache_dir,
                config,
            } => cache_status_cmd(&tickers, &cache_dir, config.as_deref()),
        },
    }
}

/// Load config, install logging, and build the shared run context.
fn setup(common: &CommonArgs) -> Result<(RunContext, MetricsStore)> {
    let (config, missing) = match &common.config {
        Some(path) => match AppConfig::from_file(path)? {
            Some(config) => (config, None),
            None => (AppConfig::default(), Some(path.clone())),
        },
        None => (AppConfig::default(), None),
    };

    init_logging(&config.logging.level);
    if let Some(path) = missing {
        warn!(path = %path.display(), "config file not found; using defaults");
    }

    let flags = RunFlags {
        offline: common.offline,
        synthetic: common.synthetic,
    };
    let store_path = config.database.path.clone();
    let ctx = RunContext::new(config, flags).context("failed to set up data sources")?;
    let store = MetricsStore::open(&store_path)
        .with_context(|| format!("failed to open database {}", store_path.display()))?;
    Ok((ctx, store))
}

fn run_cmd(ticker: &str, output: &Path, common: &CommonArgs) -> Result<()> {
    let (ctx, mut store) = setup(common)?;
    let run = run_ticker(&ctx, &mut store, ticker, output)
        .with_context(|| format!("run failed for '{ticker}'"))?;

    print_run(&run);
    println!("Record saved to: {}", run.output.display());

    if run.unrecoverable {
        eprintln!("No price data for {}", run.ticker);
        std::process::exit(1);
    }
    Ok(())
}

fn batch_cmd(tickers: &[String], output_dir: &Path, common: &CommonArgs) -> Result<()> {
    let (ctx, mut store) = setup(common)?;
    let summary = run_batch(&ctx, &mut store, tickers, output_dir).context("batch aborted")?;

    print_batch(&summary);
    println!("Records saved to: {}", output_dir.display());

    if summary.all_unrecoverable() {
        eprintln!("No ticker produced price data");
        std::process::exit(1);
    }
    Ok(())
}

fn print_run(run: &TickerRun) {
    let latest = &run.record.latest;
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"));

    println!("=== {} ===", run.ticker);
    println!("Source:          {}", run.record.source);
    println!("Rows:            {}", run.analysis.rows.len());
    println!("Quality:         {}", run.record.data_quality);
    match latest.date {
        Some(date) => println!("Latest date:     {date}"),
        None => println!("Latest date:     -"),
    }
    println!("Close:           {}", fmt(latest.close));
    println!("SMA50 / SMA200:  {} / {}", fmt(latest.sma50), fmt(latest.sma200));
    println!("52w high:        {}", fmt(latest.fifty_two_week_high));
    println!("From 52w high:   {}%", fmt(latest.pct_from_52w_high));
    println!("BVPS / PB:       {} / {}", fmt(latest.bvps), fmt(latest.pb_ratio));
    println!("Golden crosses:  {}", run.record.golden_crosses.len());
    println!("Death crosses:   {}", run.record.death_crosses.len());
    if !run.record.issues.is_empty() {
        println!("Issues:");
        for issue in &run.record.issues {
            println!("  - {issue}");
        }
    }
}

fn print_batch(summary: &BatchSummary) {
    println!(
        "{:<14} {:<10} {:<9} {:>6} {:>7} {:>6}",
        "Ticker", "Source", "Quality", "Rows", "Golden", "Death"
    );
    println!("{}", "-".repeat(57));
    for run in &summary.runs {
        println!(
            "{:<14} {:<10} {:<9} {:>6} {:>7} {:>6}",
            run.ticker,
            run.record.source,
            run.record.data_quality.as_str(),
            run.analysis.rows.len(),
            run.record.golden_crosses.len(),
            run.record.death_crosses.len(),
        );
    }
    for raw in &summary.invalid {
        println!("{:<14} (invalid symbol)", format!("'{raw}'"));
    }
    for (ticker, error) in &summary.failed {
        println!("{ticker:<14} (not written: {error})");
    }
}

fn cache_status_cmd(tickers: &[String], cache_dir: &Path, config: Option<&Path>) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let config = match config {
        Some(path) => AppConfig::from_file(path)?.unwrap_or_default(),
        None => AppConfig::default(),
    };
    let suffix = config.market.long_symbol_suffix;
    let normalized: Vec<String> = tickers
        .iter()
        .filter_map(|t| normalize_ticker(t, &suffix))
        .collect();
    let refs: Vec<&str> = normalized.iter().map(String::as_str).collect();

    let cache = PriceCache::new(cache_dir);
    println!("Cache: {}", cache_dir.display());
    println!();
    println!("{:<14} {:<25} {:>8}", "Ticker", "Date Range", "Rows");
    println!("{}", "-".repeat(49));
    for status in cache.status(&refs) {
        match (status.start_date, status.end_date, status.row_count) {
            (Some(start), Some(end), Some(rows)) if status.cached => {
                println!("{:<14} {:<25} {:>8}", status.ticker, format!("{start} to {end}"), rows);
            }
            _ => println!("{:<14} {:<25} {:>8}", status.ticker, "(not cached)", "-"),
        }
    }
    Ok(())
}
