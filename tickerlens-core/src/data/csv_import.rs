//! CSV import provider.
//!
//! Layout under the import directory:
//! - `{dir}/{TICKER}/prices.csv` with columns `date, open, high, low, close, volume`
//!   (`ticker` optional)
//! - `{dir}/{TICKER}/fundamentals_{quarterly|annual|snapshot}.csv` with columns
//!   `period_end_date, total_equity, preferred_equity, shares_outstanding,
//!   total_debt, cash_and_equivalents, market_cap` (all but the date optional)
//!
//! Unparseable cells become empty values so the validator can reject the row
//! with a precise reason. A missing fundamentals file means the tier is
//! unavailable for that ticker.

use super::provider::{DataError, DataProvider, DataSource, PriceFetch};
use crate::domain::{RawFundamentalRow, RawPriceRow, SourceTier, TierBatch};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FundamentalRecord {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    period_end_date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_equity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    preferred_equity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shares_outstanding: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_debt: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    cash_and_equivalents: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    market_cap: Option<f64>,
}

/// Reads prices and fundamentals from CSV files on disk.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn prices_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(ticker).join("prices.csv")
    }

    fn fundamentals_path(&self, ticker: &str, tier: SourceTier) -> PathBuf {
        self.dir
            .join(ticker)
            .join(format!("fundamentals_{}.csv", tier.as_str()))
    }
}

fn read_prices(path: &Path, ticker: &str) -> Result<Vec<RawPriceRow>, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<PriceRecord>() {
        let r = record?;
        rows.push(RawPriceRow {
            ticker: r.ticker.or_else(|| Some(ticker.to_string())),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        });
    }
    Ok(rows)
}

fn read_fundamentals(path: &Path, ticker: &str) -> Result<Vec<RawFundamentalRow>, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<FundamentalRecord>() {
        let r = record?;
        rows.push(RawFundamentalRow {
            ticker: r.ticker.or_else(|| Some(ticker.to_string())),
            period_end_date: r.period_end_date,
            total_equity: r.total_equity,
            preferred_equity: r.preferred_equity,
            shares_outstanding: r.shares_outstanding,
            total_debt: r.total_debt,
            cash_and_equivalents: r.cash_and_equivalents,
            market_cap: r.market_cap,
        });
    }
    Ok(rows)
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn source(&self) -> DataSource {
        DataSource::Csv
    }

    /// Returns every row in the file; the date range is not applied to
    /// imported history.
    fn fetch_prices(
        &self,
        ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<PriceFetch, DataError> {
        let path = self.prices_path(ticker);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        Ok(PriceFetch {
            ticker: ticker.to_string(),
            rows: read_prices(&path, ticker)?,
            source: DataSource::Csv,
        })
    }

    fn fetch_fundamentals(&self, ticker: &str, tier: SourceTier) -> Result<TierBatch, DataError> {
        let path = self.fundamentals_path(ticker, tier);
        if !path.exists() {
            return Err(DataError::unavailable(
                tier,
                format!("no file at {}", path.display()),
            ));
        }
        let rows = read_fundamentals(&path, ticker).map_err(|e| DataError::unavailable(tier, e))?;
        Ok(TierBatch { tier, rows })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn provider_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CsvProvider) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join("AAPL").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let provider = CsvProvider::new(dir.path());
        (dir, provider)
    }

    fn any_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn reads_prices_and_fills_ticker() {
        let (_dir, p) = provider_with(&[(
            "prices.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,1,2,0.5,1.5,100\n\
             2024-01-03,1.5,2.5,1,2,200\n",
        )]);
        let fetch = p.fetch_prices("AAPL", any_date(), any_date()).unwrap();
        assert_eq!(fetch.source, DataSource::Csv);
        assert_eq!(fetch.rows.len(), 2);
        assert_eq!(fetch.rows[0].ticker.as_deref(), Some("AAPL"));
        assert_eq!(fetch.rows[1].close, Some(2.0));
        assert_eq!(fetch.rows[1].volume, Some(200));
    }

    #[test]
    fn bad_cells_become_empty() {
        let (_dir, p) = provider_with(&[("prices.csv", "date,close\n2024-01-02,n/a\n2024-01-03,\n")]);
        let fetch = p.fetch_prices("AAPL", any_date(), any_date()).unwrap();
        assert_eq!(fetch.rows.len(), 2);
        assert!(fetch.rows.iter().all(|r| r.close.is_none()));
    }

    #[test]
    fn missing_prices_file_is_symbol_not_found() {
        let (_dir, p) = provider_with(&[]);
        assert!(matches!(
            p.fetch_prices("AAPL", any_date(), any_date()),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn fundamentals_per_tier() {
        let (_dir, p) = provider_with(&[(
            "fundamentals_quarterly.csv",
            "period_end_date,total_equity,shares_outstanding,total_debt,cash_and_equivalents\n\
             2023-12-31,1000,100,50,25\n",
        )]);
        let batch = p
            .fetch_fundamentals("AAPL", SourceTier::QuarterlyBalanceSheet)
            .unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].total_equity, Some(1000.0));
        assert_eq!(batch.rows[0].market_cap, None);

        let err = p
            .fetch_fundamentals("AAPL", SourceTier::AnnualBalanceSheet)
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::SourceUnavailable {
                tier: SourceTier::AnnualBalanceSheet,
                ..
            }
        ));
    }
}
