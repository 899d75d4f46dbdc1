//! Daily price rows: raw as delivered by a provider, and validated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A price row as delivered by a data source, before validation.
///
/// Every field is optional: providers may omit columns, send unparseable
/// dates, or report NaN for a missing close. The schema validator decides
/// what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub ticker: Option<String>,
    /// Calendar date as text (`YYYY-MM-DD`).
    pub date: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// A validated daily close for one ticker.
///
/// Within a series, dates are strictly increasing and `close` is finite and positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceRow {
    pub fn new(ticker: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            close,
        }
    }
}

impl From<&PriceRow> for RawPriceRow {
    /// Re-expose a cached row as raw input so it passes through validation like fresh data.
    fn from(row: &PriceRow) -> Self {
        RawPriceRow {
            ticker: Some(row.ticker.clone()),
            date: Some(row.date.format("%Y-%m-%d").to_string()),
            close: Some(row.close),
            ..Default::default()
        }
    }
}
