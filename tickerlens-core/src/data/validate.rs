//! Schema validation for raw price and fundamental rows.
//!
//! Rows that violate a constraint are dropped, never coerced. Each drop is
//! recorded with the `ValidationError` that caused it so the caller can log
//! or report the count; nothing here logs.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{FundamentalRow, PriceRow, RawFundamentalRow, RawPriceRow, SourceTier};

/// Why a raw row was rejected.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ValidationError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("field '{field}': cannot parse date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("field '{field}': value is not finite")]
    NotFinite { field: &'static str },

    #[error("field '{field}': must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("field '{field}': must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("field 'high' ({high}) is below field 'low' ({low})")]
    HighBelowLow { high: f64, low: f64 },

    #[error("field 'close' ({close}) lies outside the day's range [{low}, {high}]")]
    CloseOutsideRange { close: f64, low: f64, high: f64 },

    #[error("field 'date': {date} does not come after previous date {previous}")]
    NonMonotonicDate { date: NaiveDate, previous: NaiveDate },

    #[error("field 'period_end_date': {date} already reported by this tier")]
    DuplicatePeriod { date: NaiveDate },

    #[error("field 'ticker': expected '{expected}', found '{found}'")]
    TickerMismatch { expected: String, found: String },

    #[error("report carries no fundamental measure")]
    NoMeasures,
}

/// A rejected row: its position in the raw input and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRow {
    pub index: usize,
    pub error: ValidationError,
}

/// Outcome of validating one raw series.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub rows: Vec<T>,
    pub dropped: Vec<DroppedRow>,
}

impl<T> Validated<T> {
    /// Number of raw rows seen.
    pub fn received(&self) -> usize {
        self.rows.len() + self.dropped.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

/// Validate one raw price row in isolation (no ordering checks).
pub fn validate_price_row(raw: &RawPriceRow, ticker: &str) -> Result<PriceRow, ValidationError> {
    check_ticker(raw.ticker.as_deref(), ticker)?;
    let date = parse_date("date", raw.date.as_deref())?;

    let close = raw.close.ok_or(ValidationError::MissingField { field: "close" })?;
    positive("close", close)?;
    if let Some(open) = raw.open {
        positive("open", open)?;
    }
    if let Some(high) = raw.high {
        positive("high", high)?;
    }
    if let Some(low) = raw.low {
        positive("low", low)?;
    }

    if let (Some(high), Some(low)) = (raw.high, raw.low) {
        if high < low {
            return Err(ValidationError::HighBelowLow { high, low });
        }
        if close < low || close > high {
            return Err(ValidationError::CloseOutsideRange { close, low, high });
        }
    }

    Ok(PriceRow::new(ticker, date, close))
}

/// Validate a raw price series that is expected in ascending date order.
///
/// A row whose date does not come strictly after the last accepted date is
/// dropped as `NonMonotonicDate`, which also removes duplicates.
pub fn validate_prices(ticker: &str, raw: &[RawPriceRow]) -> Validated<PriceRow> {
    let mut out: Validated<PriceRow> = Validated::default();
    for (index, row) in raw.iter().enumerate() {
        let checked = validate_price_row(row, ticker).and_then(|row| {
            match out.rows.last() {
                Some(prev) if row.date <= prev.date => Err(ValidationError::NonMonotonicDate {
                    date: row.date,
                    previous: prev.date,
                }),
                _ => Ok(row),
            }
        });
        match checked {
            Ok(row) => out.rows.push(row),
            Err(error) => out.dropped.push(DroppedRow { index, error }),
        }
    }
    out
}

/// Validate one raw fundamental report in isolation.
pub fn validate_fundamental_row(
    raw: &RawFundamentalRow,
    ticker: &str,
    tier: SourceTier,
) -> Result<FundamentalRow, ValidationError> {
    check_ticker(raw.ticker.as_deref(), ticker)?;
    let period_end_date = parse_date("period_end_date", raw.period_end_date.as_deref())?;

    if let Some(v) = raw.total_equity {
        finite("total_equity", v)?;
    }
    for (field, value) in [
        ("preferred_equity", raw.preferred_equity),
        ("shares_outstanding", raw.shares_outstanding),
        ("total_debt", raw.total_debt),
        ("cash_and_equivalents", raw.cash_and_equivalents),
        ("market_cap", raw.market_cap),
    ] {
        if let Some(v) = value {
            non_negative(field, v)?;
        }
    }

    let row = FundamentalRow {
        ticker: ticker.to_string(),
        period_end_date,
        tier,
        total_equity: raw.total_equity,
        preferred_equity: raw.preferred_equity,
        shares_outstanding: raw.shares_outstanding,
        total_debt: raw.total_debt,
        cash_and_equivalents: raw.cash_and_equivalents,
        market_cap: raw.market_cap,
    };
    if !row.has_any_measure() {
        return Err(ValidationError::NoMeasures);
    }
    Ok(row)
}

/// Validate the reports of one tier.
///
/// Providers commonly return reports newest-first, so accepted rows are
/// returned sorted by period end. A period reported twice keeps the first
/// occurrence in input order; later ones are dropped as `DuplicatePeriod`.
pub fn validate_fundamentals(
    ticker: &str,
    tier: SourceTier,
    raw: &[RawFundamentalRow],
) -> Validated<FundamentalRow> {
    let mut out: Validated<FundamentalRow> = Validated::default();
    for (index, row) in raw.iter().enumerate() {
        let checked = validate_fundamental_row(row, ticker, tier).and_then(|row| {
            if out
                .rows
                .iter()
                .any(|seen| seen.period_end_date == row.period_end_date)
            {
                Err(ValidationError::DuplicatePeriod {
                    date: row.period_end_date,
                })
            } else {
                Ok(row)
            }
        });
        match checked {
            Ok(row) => out.rows.push(row),
            Err(error) => out.dropped.push(DroppedRow { index, error }),
        }
    }
    out.rows.sort_by_key(|r| r.period_end_date);
    out
}

fn check_ticker(found: Option<&str>, expected: &str) -> Result<(), ValidationError> {
    let found = found
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ValidationError::MissingField { field: "ticker" })?;
    if !found.eq_ignore_ascii_case(expected) {
        return Err(ValidationError::TickerMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Parse `YYYY-MM-DD`, tolerating a trailing time component (`2024-01-02T00:00:00`).
fn parse_date(field: &'static str, value: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField { field })?;
    let day_part = value
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(value);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}
