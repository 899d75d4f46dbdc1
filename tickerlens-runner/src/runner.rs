//! Ticker runner: wires loading, the core pipeline, persistence and export.
//!
//! Two entry points:
//! - `run_ticker()`: one ticker end to end. Used by `tickerlens run`.
//! - `run_batch()`: many tickers; the load + compute half runs in parallel,
//!   the write half runs sequentially in input order. Used by `tickerlens batch`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use tickerlens_core::data::{
    CsvProvider, DataError, DataProvider, DataSource, PriceCache, SyntheticProvider, YahooProvider,
};
use tickerlens_core::quality::missing_fields;
use tickerlens_core::{process_ticker, PipelineError, TickerAnalysis, TickerInput};

use crate::config::{AppConfig, ConfigError, ProviderKind};
use crate::data_loader::{load_ticker, LoadError, LoadOptions};
use crate::export::{write_record, ExportError, OutputRecord};
use crate::store::{MetricsStore, SaveSummary, StoreError};
use crate::ticker::normalize_ticker;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data provider error: {0}")]
    Provider(#[from] DataError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("invalid ticker symbol '{0}'")]
    InvalidTicker(String),
}

/// Command-line switches layered over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    /// No network: the Yahoo provider is not constructed.
    pub offline: bool,
    /// Use the synthetic provider regardless of the configured one.
    pub synthetic: bool,
}

/// Everything a run needs that is shared across tickers.
pub struct RunContext {
    pub config: AppConfig,
    pub cache: PriceCache,
    provider: Option<Box<dyn DataProvider>>,
    opts: LoadOptions,
}

impl RunContext {
    /// Build a context from config plus flags, ending the history window today.
    pub fn new(config: AppConfig, flags: RunFlags) -> Result<Self, RunError> {
        let provider = build_provider(&config, flags)?;
        let today = chrono::Local::now().date_naive();
        Self::with_provider(config, provider, today)
    }

    /// Build a context around an explicit provider and end date.
    pub fn with_provider(
        config: AppConfig,
        provider: Option<Box<dyn DataProvider>>,
        end: NaiveDate,
    ) -> Result<Self, RunError> {
        let opts = LoadOptions {
            start: config.history_start(end)?,
            end,
        };
        Ok(Self {
            cache: PriceCache::new(config.data.cache_dir.clone()),
            config,
            provider,
            opts,
        })
    }

    pub fn provider(&self) -> Option<&dyn DataProvider> {
        self.provider.as_deref()
    }

    pub fn load_options(&self) -> &LoadOptions {
        &self.opts
    }
}

/// Pick the provider for this run. `--synthetic` wins; `--offline` (or
/// `data.offline`) disables only the network-backed provider.
pub fn build_provider(
    config: &AppConfig,
    flags: RunFlags,
) -> Result<Option<Box<dyn DataProvider>>, RunError> {
    if flags.synthetic {
        return Ok(Some(Box::new(SyntheticProvider::new())));
    }
    let offline = flags.offline || config.data.offline;
    let provider: Option<Box<dyn DataProvider>> = match config.data.provider {
        ProviderKind::Synthetic => Some(Box::new(SyntheticProvider::new())),
        ProviderKind::Csv => Some(Box::new(CsvProvider::new(config.data.csv_dir.clone()))),
        ProviderKind::Yahoo if offline => None,
        ProviderKind::Yahoo => Some(Box::new(YahooProvider::new()?)),
    };
    Ok(provider)
}

/// The outcome of one ticker.
#[derive(Debug, Clone)]
pub struct TickerRun {
    pub ticker: String,
    pub analysis: TickerAnalysis,
    pub record: OutputRecord,
    /// Where the prices came from; `None` when nothing was found.
    pub source: Option<DataSource>,
    /// No price rows from the provider and none cached.
    pub unrecoverable: bool,
    pub saved: SaveSummary,
    pub output: PathBuf,
}

/// Load + compute half of a ticker run. No shared writes happen here.
#[derive(Debug)]
struct Prepared {
    ticker: String,
    analysis: TickerAnalysis,
    source: Option<DataSource>,
    issues: Vec<String>,
    unrecoverable: bool,
}

fn prepare(ctx: &RunContext, ticker: &str) -> Result<Prepared, RunError> {
    let (input, source, mut issues, unrecoverable) =
        match load_ticker(ticker, ctx.provider(), &ctx.cache, &ctx.opts) {
            Ok(loaded) => (loaded.input, Some(loaded.source), loaded.issues, false),
            Err(e @ LoadError::NoPriceData { .. }) => {
                warn!(ticker, error = %e, "ticker is unrecoverable; reporting as missing");
                (TickerInput::new(ticker), None, vec![e.to_string()], true)
            }
        };

    let analysis = process_ticker(&input)?;

    let dropped = analysis.report.total_dropped();
    if dropped > 0 {
        warn!(ticker, dropped, "dropped rows that failed validation");
        issues.push(format!("{dropped} rows dropped by validation"));
    }
    if let Some(empty) = &analysis.report.empty_series {
        if !unrecoverable {
            warn!(ticker, "no valid price rows after validation");
            issues.push(empty.to_string());
        }
    }
    if let Some(latest) = analysis.latest() {
        let missing = missing_fields(latest);
        if !missing.is_empty() {
            issues.push(format!("latest row lacks {}", missing.join(", ")));
        }
    }

    Ok(Prepared {
        ticker: ticker.to_string(),
        analysis,
        source,
        issues,
        unrecoverable,
    })
}

fn finish(
    ctx: &RunContext,
    store: &mut MetricsStore,
    mut prepared: Prepared,
    output: &Path,
) -> Result<TickerRun, RunError> {
    let ticker = prepared.ticker.as_str();
    let analysis = &prepared.analysis;

    if let Some(source) = prepared.source {
        if source != DataSource::Cache && !analysis.prices.is_empty() {
            if let Err(e) = ctx.cache.write(ticker, &analysis.prices, source.as_str()) {
                warn!(ticker, error = %e, "cache write-back failed");
                prepared.issues.push(format!("cache write-back failed: {e}"));
            }
        }
    }

    let saved = store.save_analysis(analysis)?;

    let source_label = prepared.source.map_or("none", |s| s.as_str());
    let record = OutputRecord::from_analysis(analysis, source_label, &prepared.issues);
    write_record(&record, output)?;

    info!(
        ticker,
        rows = analysis.rows.len(),
        golden = record.golden_crosses.len(),
        death = record.death_crosses.len(),
        grade = %analysis.quality,
        source = source_label,
        metrics = saved.metrics_written,
        new_signals = saved.signals_inserted,
        "ticker processed"
    );

    Ok(TickerRun {
        ticker: prepared.ticker,
        analysis: prepared.analysis,
        record,
        source: prepared.source,
        unrecoverable: prepared.unrecoverable,
        saved,
        output: output.to_path_buf(),
    })
}

fn normalize(ctx: &RunContext, raw: &str) -> Result<String, RunError> {
    normalize_ticker(raw, &ctx.config.market.long_symbol_suffix)
        .ok_or_else(|| RunError::InvalidTicker(raw.to_string()))
}

/// Run one ticker end to end and write its record to `output`.
///
/// An unrecoverable ticker still yields `Ok` with a `missing` record on disk;
/// check [`TickerRun::unrecoverable`].
pub fn run_ticker(
    ctx: &RunContext,
    store: &mut MetricsStore,
    raw_ticker: &str,
    output: &Path,
) -> Result<TickerRun, RunError> {
    let ticker = normalize(ctx, raw_ticker)?;
    let prepared = prepare(ctx, &ticker)?;
    finish(ctx, store, prepared, output)
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// One entry per valid ticker, in input order.
    pub runs: Vec<TickerRun>,
    /// Symbols rejected before loading.
    pub invalid: Vec<String>,
    /// Tickers whose persist or export step failed, with the error text.
    /// They count as `missing`; the rest of the batch still runs.
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn unrecoverable_count(&self) -> usize {
        self.runs.iter().filter(|r| r.unrecoverable).count() + self.invalid.len()
    }

    /// True when not a single ticker produced data and was written.
    pub fn all_unrecoverable(&self) -> bool {
        self.runs.iter().all(|r| r.unrecoverable)
    }
}

/// Record path for `ticker` inside `output_dir`.
pub fn output_path(output_dir: &Path, ticker: &str) -> PathBuf {
    output_dir.join(format!("{ticker}.json"))
}

/// Run many tickers, writing `{output_dir}/{TICKER}.json` for each.
///
/// Per-ticker load, persist and export failures are absorbed as `missing`;
/// a `PipelineError` from any ticker aborts the batch before anything is
/// written.
pub fn run_batch(
    ctx: &RunContext,
    store: &mut MetricsStore,
    raw_tickers: &[String],
    output_dir: &Path,
) -> Result<BatchSummary, RunError> {
    let mut summary = BatchSummary::default();
    let mut tickers = Vec::with_capacity(raw_tickers.len());
    for raw in raw_tickers {
        match normalize(ctx, raw) {
            Ok(t) if !tickers.contains(&t) => tickers.push(t),
            Ok(t) => warn!(ticker = %t, "duplicate ticker in batch; skipping"),
            Err(e) => {
                warn!(error = %e, "skipping ticker");
                summary.invalid.push(raw.clone());
            }
        }
    }

    info!(tickers = tickers.len(), "batch started");

    let prepared: Vec<Prepared> = tickers
        .par_iter()
        .map(|t| prepare(ctx, t))
        .collect::<Result<_, _>>()?;

    for p in prepared {
        let output = output_path(output_dir, &p.ticker);
        let ticker = p.ticker.clone();
        match finish(ctx, store, p, &output) {
            Ok(run) => summary.runs.push(run),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "ticker not written; continuing batch");
                summary.failed.push((ticker, e.to_string()));
            }
        }
    }

    info!(
        processed = summary.runs.len(),
        unrecoverable = summary.unrecoverable_count(),
        failed = summary.failed.len(),
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickerlens_core::QualityGrade;

    fn config(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.data.cache_dir = dir.join("cache");
        config.data.history_period = "2y".into();
        config
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn offline_yahoo_has_no_provider() {
        let mut config = AppConfig::default();
        config.data.provider = ProviderKind::Yahoo;
        let flags = RunFlags {
            offline: true,
            synthetic: false,
        };
        assert!(build_provider(&config, flags).unwrap().is_none());
    }

    #[test]
    fn synthetic_flag_overrides_config() {
        let config = AppConfig::default();
        let flags = RunFlags {
            offline: true,
            synthetic: true,
        };
        let provider = build_provider(&config, flags).unwrap().unwrap();
        assert_eq!(provider.source(), DataSource::Synthetic);
    }

    #[test]
    fn csv_provider_survives_offline() {
        let mut config = AppConfig::default();
        config.data.provider = ProviderKind::Csv;
        let flags = RunFlags {
            offline: true,
            synthetic: false,
        };
        let provider = build_provider(&config, flags).unwrap().unwrap();
        assert_eq!(provider.source(), DataSource::Csv);
    }

    #[test]
    fn load_window_follows_history_period() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::with_provider(config(dir.path()), None, today()).unwrap();
        assert_eq!(ctx.load_options().start, NaiveDate::from_ymd_opt(2022, 6, 28).unwrap());
        assert_eq!(ctx.load_options().end, today());
    }

    #[test]
    fn synthetic_run_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::with_provider(
            config(dir.path()),
            Some(Box::new(SyntheticProvider::new())),
            today(),
        )
        .unwrap();
        let mut store = MetricsStore::open_in_memory().unwrap();
        let output = dir.path().join("out.json");

        let run = run_ticker(&ctx, &mut store, " msft ", &output).unwrap();
        assert_eq!(run.ticker, "MSFT");
        assert!(!run.unrecoverable);
        assert_eq!(run.source, Some(DataSource::Synthetic));
        assert_eq!(run.record.source, "synthetic");
        assert!(output.exists());
        assert_eq!(store.metric_count("MSFT").unwrap(), run.analysis.rows.len());
        assert!(ctx.cache.get_meta("MSFT").is_some());
    }

    #[test]
    fn unrecoverable_ticker_still_writes_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::with_provider(config(dir.path()), None, today()).unwrap();
        let mut store = MetricsStore::open_in_memory().unwrap();
        let output = dir.path().join("none.json");

        let run = run_ticker(&ctx, &mut store, "ZZZZ", &output).unwrap();
        assert!(run.unrecoverable);
        assert_eq!(run.analysis.quality, QualityGrade::Missing);
        assert_eq!(run.record.source, "none");
        assert!(run.record.latest.close.is_none());
        assert!(output.exists());
    }

    #[test]
    fn blank_ticker_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::with_provider(config(dir.path()), None, today()).unwrap();
        let mut store = MetricsStore::open_in_memory().unwrap();
        let err = run_ticker(&ctx, &mut store, "  ", &dir.path().join("x.json")).unwrap_err();
        assert!(matches!(err, RunError::InvalidTicker(_)));
    }

    #[test]
    fn batch_summary_counts() {
        let summary = BatchSummary {
            invalid: vec!["".into()],
            ..Default::default()
        };
        assert!(summary.all_unrecoverable());
        assert_eq!(summary.unrecoverable_count(), 1);
    }
}
