//! Derived rows: aligned price+fundamentals, indicator rows, and signal events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::fundamental::SourceTier;

/// Fundamental measures in effect on a trading date.
///
/// Every measure is `None` until a report with a period end on or before the
/// trading date exists. `as_of`/`tier` describe the report that supplied
/// `total_equity` (or, failing that, the freshest report considered).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarriedFundamentals {
    pub as_of: Option<NaiveDate>,
    pub tier: Option<SourceTier>,
    pub total_equity: Option<f64>,
    pub preferred_equity: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub market_cap: Option<f64>,
}

impl CarriedFundamentals {
    /// True before the first fundamental report is available.
    pub fn is_empty(&self) -> bool {
        self.as_of.is_none()
    }
}

/// One trading date with the fundamentals carried forward onto it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub fundamentals: CarriedFundamentals,
}

/// An aligned row extended with technical indicators and fundamental ratios.
///
/// Each derived field is independently nullable based on input sufficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub aligned: AlignedRow,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub pct_from_52w_high: Option<f64>,
    pub bvps: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
}

impl IndicatorRow {
    pub fn date(&self) -> NaiveDate {
        self.aligned.date
    }

    pub fn close(&self) -> f64 {
        self.aligned.close
    }
}

/// Kind of moving-average crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    GoldenCross,
    DeathCross,
}

impl SignalKind {
    /// Name stored in the `signal_events.type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::GoldenCross => "GoldenCross",
            SignalKind::DeathCross => "DeathCross",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crossover detected on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub ticker: String,
    pub date: NaiveDate,
    pub kind: SignalKind,
}
