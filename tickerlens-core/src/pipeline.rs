//! Per-ticker pipeline: validate → align → indicators → signals → quality.
//!
//! `process_ticker` is a pure function of its input. It does no I/O and
//! shares nothing across tickers, so an outer driver may run many tickers in
//! parallel without changing any result. Row- and ticker-level problems are
//! absorbed into the returned [`TickerAnalysis`]; only a broken upstream
//! contract surfaces as a [`PipelineError`].

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::data::align::{align_series, AlignError, EmptySeriesError};
use crate::data::validate::{validate_fundamentals, validate_prices, DroppedRow, Validated};
use crate::domain::{
    FundamentalRow, IndicatorRow, PriceRow, RawPriceRow, SignalEvent, SignalKind, SourceTier,
    TierBatch,
};
use crate::indicators::IndicatorEngine;
use crate::quality::{assess, QualityGrade};
use crate::signals::detect_crossovers;

/// Fatal contract violations. Everything else degrades the result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("duplicate trading date {date} for '{ticker}' survived validation")]
    DuplicateDate { ticker: String, date: NaiveDate },

    #[error("trading dates for '{ticker}' out of order: {date} follows {previous}")]
    NonIncreasingDates {
        ticker: String,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// Everything the pipeline needs for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerInput {
    pub ticker: String,
    pub prices: Vec<RawPriceRow>,
    /// One batch per tier that answered; order does not matter.
    pub fundamentals: Vec<TierBatch>,
}

impl TickerInput {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            prices: Vec::new(),
            fundamentals: Vec::new(),
        }
    }
}

/// Counts for one validated series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageCounts {
    pub received: usize,
    pub accepted: usize,
    pub dropped: Vec<DroppedRow>,
}

impl StageCounts {
    fn from_validated<T>(v: &Validated<T>) -> Self {
        Self {
            received: v.received(),
            accepted: v.rows.len(),
            dropped: v.dropped.clone(),
        }
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// What happened at each stage for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageReport {
    pub prices: StageCounts,
    pub fundamentals: Vec<(SourceTier, StageCounts)>,
    /// Set when no price row survived validation.
    #[serde(skip)]
    pub empty_series: Option<EmptySeriesError>,
}

impl StageReport {
    /// Total rows dropped across prices and every fundamental tier.
    pub fn total_dropped(&self) -> usize {
        self.prices.dropped_count()
            + self
                .fundamentals
                .iter()
                .map(|(_, c)| c.dropped_count())
                .sum::<usize>()
    }
}

/// Derived result for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub rows: Vec<IndicatorRow>,
    pub signals: Vec<SignalEvent>,
    pub quality: QualityGrade,
    pub report: StageReport,
    /// Validated inputs, kept for fingerprinting and cache write-back.
    pub prices: Vec<PriceRow>,
    pub fundamentals: Vec<FundamentalRow>,
}

impl TickerAnalysis {
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// Dates of the given crossover kind, ascending.
    pub fn dates_of(&self, kind: SignalKind) -> Vec<NaiveDate> {
        self.signals
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.date)
            .collect()
    }

    pub fn golden_crosses(&self) -> Vec<NaiveDate> {
        self.dates_of(SignalKind::GoldenCross)
    }

    pub fn death_crosses(&self) -> Vec<NaiveDate> {
        self.dates_of(SignalKind::DeathCross)
    }

    pub fn is_empty_series(&self) -> bool {
        self.report.empty_series.is_some()
    }
}

/// Run the whole pipeline for one ticker.
pub fn process_ticker(input: &TickerInput) -> Result<TickerAnalysis, PipelineError> {
    let ticker = input.ticker.as_str();
    let mut report = StageReport::default();

    let prices = validate_prices(ticker, &input.prices);
    report.prices = StageCounts::from_validated(&prices);

    let mut fundamentals = Vec::new();
    for batch in &input.fundamentals {
        let validated = validate_fundamentals(ticker, batch.tier, &batch.rows);
        report
            .fundamentals
            .push((batch.tier, StageCounts::from_validated(&validated)));
        fundamentals.extend(validated.rows);
    }
    report.fundamentals.sort_by_key(|(tier, _)| *tier);

    derive(ticker, prices.rows, fundamentals, report)
}

/// Align and derive over already-validated rows.
fn derive(
    ticker: &str,
    prices: Vec<PriceRow>,
    fundamentals: Vec<FundamentalRow>,
    mut report: StageReport,
) -> Result<TickerAnalysis, PipelineError> {
    let aligned = match align_series(ticker, &prices, &fundamentals) {
        Ok(aligned) => aligned,
        Err(AlignError::EmptySeries(err)) => {
            report.empty_series = Some(err);
            Vec::new()
        }
        Err(AlignError::NonIncreasingDates {
            ticker,
            date,
            previous,
        }) => {
            return Err(if date == previous {
                PipelineError::DuplicateDate { ticker, date }
            } else {
                PipelineError::NonIncreasingDates {
                    ticker,
                    date,
                    previous,
                }
            });
        }
    };

    let rows = IndicatorEngine::new().compute(&aligned);
    let signals = detect_crossovers(ticker, &rows);
    let quality = assess(&rows);

    Ok(TickerAnalysis {
        ticker: ticker.to_string(),
        rows,
        signals,
        quality,
        report,
        prices,
        fundamentals,
    })
}
