//! JSON export of a ticker's output record.
//!
//! Every record carries a `schema_version`; unknown versions are rejected on
//! load. Files are written atomically (tmp + rename in the target directory).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickerlens_core::domain::IndicatorRow;
use tickerlens_core::fingerprint::dataset_hash;
use tickerlens_core::{QualityGrade, TickerAnalysis};

/// Current output schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize output record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported schema version {found} (max supported: {SCHEMA_VERSION})")]
    UnsupportedSchema { found: u32 },
}

/// The latest derived row, with explicit nulls for anything not computable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub date: Option<NaiveDate>,
    pub close: Option<f64>,
    #[serde(rename = "SMA50")]
    pub sma50: Option<f64>,
    #[serde(rename = "SMA200")]
    pub sma200: Option<f64>,
    #[serde(rename = "52w_high")]
    pub fifty_two_week_high: Option<f64>,
    /// Rounded to two decimals.
    pub pct_from_52w_high: Option<f64>,
    pub bvps: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
}

impl From<&IndicatorRow> for LatestSnapshot {
    fn from(row: &IndicatorRow) -> Self {
        Self {
            date: Some(row.date()),
            close: Some(row.close()),
            sma50: row.sma50,
            sma200: row.sma200,
            fifty_two_week_high: row.fifty_two_week_high,
            pct_from_52w_high: row.pct_from_52w_high.map(round2),
            bvps: row.bvps,
            pb_ratio: row.pb_ratio,
            market_cap: row.market_cap,
            enterprise_value: row.enterprise_value,
        }
    }
}

/// The document written per ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub schema_version: u32,
    pub ticker: String,
    pub golden_crosses: Vec<NaiveDate>,
    pub death_crosses: Vec<NaiveDate>,
    pub latest: LatestSnapshot,
    pub data_quality: QualityGrade,
    pub dataset_hash: String,
    pub source: String,
    pub issues: Vec<String>,
}

impl OutputRecord {
    pub fn from_analysis(analysis: &TickerAnalysis, source: &str, issues: &[String]) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            ticker: analysis.ticker.clone(),
            golden_crosses: analysis.golden_crosses(),
            death_crosses: analysis.death_crosses(),
            latest: analysis.latest().map(LatestSnapshot::from).unwrap_or_default(),
            data_quality: analysis.quality,
            dataset_hash: dataset_hash(&analysis.ticker, &analysis.prices, &analysis.fundamentals),
            source: source.to_string(),
            issues: issues.to_vec(),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Serialize a record to pretty JSON.
pub fn export_json(record: &OutputRecord) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Deserialize a record, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<OutputRecord, ExportError> {
    let record: OutputRecord = serde_json::from_str(json)?;
    if record.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: record.schema_version,
        });
    }
    Ok(record)
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError {
    let path = path.to_path_buf();
    move |source| ExportError::Io { path, source }
}

/// Write a record to `path`, creating parent directories.
pub fn write_record(record: &OutputRecord, path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let json = export_json(record)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(path)(source)
    })
}

/// Read a record back from disk.
pub fn read_record(path: &Path) -> Result<OutputRecord, ExportError> {
    let json = fs::read_to_string(path).map_err(io_err(path))?;
    import_json(&json)
}
