//! Parquet price-history cache with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/ticker={TICKER}/{year}.parquet` plus `meta.json`.
//!
//! - Writes are atomic per partition (write to .tmp, rename into place) and
//!   replace the ticker's whole history.
//! - Partitions are checked on load (schema, row count > 0); a corrupt file
//!   is renamed to `{file}.quarantined` and reported back to the caller.

use super::provider::DataError;
use crate::domain::PriceRow;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata sidecar for a cached ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub row_count: usize,
    pub data_hash: String,
    pub source: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// Rows read back from the cache, plus any partitions quarantined on the way.
#[derive(Debug, Clone)]
pub struct CacheLoad {
    pub rows: Vec<PriceRow>,
    pub quarantined: Vec<PathBuf>,
}

/// Cache status for a single ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub ticker: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub row_count: Option<usize>,
}

/// The Parquet price cache.
#[derive(Debug, Clone)]
pub struct PriceCache {
    cache_dir: PathBuf,
}

impl PriceCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.cache_dir.join(format!("ticker={ticker}"))
    }

    fn year_path(&self, ticker: &str, year: i32) -> PathBuf {
        self.ticker_dir(ticker).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, ticker: &str) -> PathBuf {
        self.ticker_dir(ticker).join("meta.json")
    }

    /// Replace the cached history of `ticker` with `rows` (ascending by date).
    pub fn write(&self, ticker: &str, rows: &[PriceRow], source: &str) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Err(DataError::CacheError("no rows to cache".into()));
        };

        let dir = self.ticker_dir(ticker);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut by_year: BTreeMap<i32, Vec<&PriceRow>> = BTreeMap::new();
        for row in rows {
            by_year.entry(row.date.year()).or_default().push(row);
        }

        for (year, year_rows) in &by_year {
            let mut df = rows_to_dataframe(year_rows)?;
            let path = self.year_path(ticker, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;

            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        // drop partitions left over from an older, longer history
        for path in parquet_files(&dir)? {
            let stale = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i32>().ok())
                .map_or(true, |year| !by_year.contains_key(&year));
            if stale {
                fs::remove_file(&path)
                    .map_err(|e| DataError::CacheError(format!("remove stale partition: {e}")))?;
            }
        }

        let hash_input = serde_json::to_vec(rows)
            .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            ticker: ticker.to_string(),
            start_date: first.date,
            end_date: last.date,
            row_count: rows.len(),
            data_hash: blake3::hash(&hash_input).to_hex().to_string(),
            source: source.to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(ticker), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load every cached row for `ticker`, sorted by date ascending.
    pub fn load(&self, ticker: &str) -> Result<CacheLoad, DataError> {
        let dir = self.ticker_dir(ticker);
        if !dir.exists() {
            return Err(DataError::NoCachedData {
                ticker: ticker.to_string(),
            });
        }

        let mut rows = Vec::new();
        let mut quarantined = Vec::new();

        for path in parquet_files(&dir)? {
            match load_and_validate_parquet(&path, ticker) {
                Ok(part) => rows.extend(part),
                Err(_) => {
                    let target = path.with_extension("parquet.quarantined");
                    if fs::rename(&path, &target).is_ok() {
                        quarantined.push(target);
                    }
                }
            }
        }

        if rows.is_empty() {
            return Err(DataError::NoCachedData {
                ticker: ticker.to_string(),
            });
        }

        rows.sort_by_key(|r| r.date);
        Ok(CacheLoad { rows, quarantined })
    }

    pub fn get_meta(&self, ticker: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(ticker)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Which tickers have cached data, and their date ranges.
    pub fn status(&self, tickers: &[&str]) -> Vec<CacheStatus> {
        tickers
            .iter()
            .map(|ticker| {
                let meta = self.get_meta(ticker);
                CacheStatus {
                    ticker: ticker.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    row_count: meta.as_ref().map(|m| m.row_count),
                }
            })
            .collect()
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn parquet_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let entries =
        fs::read_dir(dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
            .path();
        if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn rows_to_dataframe(rows: &[&PriceRow]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path, ticker: &str) -> Result<Vec<PriceRow>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ParquetError("empty parquet file".into()));
    }

    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));
    let dates = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let closes = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = dates
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let close = closes
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null close at row {i}")))?;
        rows.push(PriceRow::new(
            ticker,
            epoch() + chrono::Duration::days(days as i64),
            close,
        ));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_rows() -> Vec<PriceRow> {
        vec![
            PriceRow::new("AAPL", day(2023, 12, 29), 192.5),
            PriceRow::new("AAPL", day(2024, 1, 2), 185.6),
            PriceRow::new("AAPL", day(2024, 1, 3), 184.2),
        ]
    }

    #[test]
    fn write_and_load_across_years() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        cache.write("AAPL", &sample_rows(), "yahoo").unwrap();
        assert!(dir.path().join("ticker=AAPL/2023.parquet").exists());
        assert!(dir.path().join("ticker=AAPL/2024.parquet").exists());

        let loaded = cache.load("AAPL").unwrap();
        assert_eq!(loaded.rows, sample_rows());
        assert!(loaded.quarantined.is_empty());
    }

    #[test]
    fn load_nonexistent_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        assert!(matches!(
            cache.load("NONE"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn rewrite_drops_stale_years() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        cache.write("AAPL", &sample_rows(), "yahoo").unwrap();
        cache.write("AAPL", &sample_rows()[1..], "yahoo").unwrap();

        assert!(!dir.path().join("ticker=AAPL/2023.parquet").exists());
        assert_eq!(cache.load("AAPL").unwrap().rows.len(), 2);
    }

    #[test]
    fn corrupt_partition_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        cache.write("AAPL", &sample_rows(), "yahoo").unwrap();
        fs::write(dir.path().join("ticker=AAPL/2023.parquet"), b"not parquet").unwrap();

        let loaded = cache.load("AAPL").unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.quarantined.len(), 1);
        assert!(dir
            .path()
            .join("ticker=AAPL/2023.parquet.quarantined")
            .exists());
    }

    #[test]
    fn meta_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        cache.write("AAPL", &sample_rows(), "csv").unwrap();
        let meta = cache.get_meta("AAPL").unwrap();
        assert_eq!(meta.row_count, 3);
        assert_eq!(meta.start_date, day(2023, 12, 29));
        assert_eq!(meta.source, "csv");

        let statuses = cache.status(&["AAPL", "MSFT"]);
        assert!(statuses[0].cached);
        assert!(!statuses[1].cached);
        assert_eq!(statuses[1].row_count, None);
    }

    #[test]
    fn empty_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        assert!(cache.write("AAPL", &[], "yahoo").is_err());
    }
}
