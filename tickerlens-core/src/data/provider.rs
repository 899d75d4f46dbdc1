//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV
//! import, synthetic) so the runner can swap implementations and tests can
//! mock them. Providers hand back loosely typed raw rows; the validator
//! decides what survives.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{RawPriceRow, SourceTier, TierBatch};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    /// One fundamental tier could not be fetched. Callers degrade to the
    /// next tier or to null fundamentals; never fatal.
    #[error("{tier} fundamentals unavailable: {reason}")]
    SourceUnavailable { tier: SourceTier, reason: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for ticker '{ticker}'")]
    NoCachedData { ticker: String },

    #[error("csv import error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Wrap any failure as a tier outage.
    pub fn unavailable(tier: SourceTier, reason: impl fmt::Display) -> Self {
        DataError::SourceUnavailable {
            tier,
            reason: reason.to_string(),
        }
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Yahoo,
    Csv,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Yahoo => "yahoo",
            DataSource::Csv => "csv",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful price fetch for a single ticker.
#[derive(Debug, Clone)]
pub struct PriceFetch {
    pub ticker: String,
    pub rows: Vec<RawPriceRow>,
    pub source: DataSource,
}

/// Trait for data providers (Yahoo Finance, CSV import, synthetic).
///
/// Implementations handle the specifics of one source. The cache layer sits
/// above this trait; providers don't know about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which [`DataSource`] results from this provider are tagged with.
    fn source(&self) -> DataSource;

    /// Fetch raw daily price rows for a ticker over an inclusive date range.
    /// An empty `rows` vector is a valid answer.
    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceFetch, DataError>;

    /// Fetch every report one fundamental tier has for a ticker.
    ///
    /// Failures should come back as [`DataError::SourceUnavailable`].
    fn fetch_fundamentals(&self, ticker: &str, tier: SourceTier) -> Result<TierBatch, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
