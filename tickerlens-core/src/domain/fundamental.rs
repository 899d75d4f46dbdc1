//! Fundamental (balance-sheet) rows and their source tiers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a fundamental report came from, in priority order.
///
/// Declaration order is priority order: `QuarterlyBalanceSheet` beats
/// `AnnualBalanceSheet` beats `SummarySnapshot`. `Ord` follows it, so the
/// smallest tier is the most trusted one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    QuarterlyBalanceSheet,
    AnnualBalanceSheet,
    SummarySnapshot,
}

impl SourceTier {
    /// All tiers, highest priority first.
    pub const PRIORITY: [SourceTier; 3] = [
        SourceTier::QuarterlyBalanceSheet,
        SourceTier::AnnualBalanceSheet,
        SourceTier::SummarySnapshot,
    ];

    /// Short name used in file names and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::QuarterlyBalanceSheet => "quarterly",
            SourceTier::AnnualBalanceSheet => "annual",
            SourceTier::SummarySnapshot => "snapshot",
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fundamental report as delivered by a data source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFundamentalRow {
    pub ticker: Option<String>,
    /// Period end as text (`YYYY-MM-DD`).
    pub period_end_date: Option<String>,
    pub total_equity: Option<f64>,
    pub preferred_equity: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub market_cap: Option<f64>,
}

/// A validated fundamental report for one period from one tier.
///
/// Individual measures stay optional: a report that carries equity but no
/// debt figure is still useful, and the aligner fills the gap from a
/// lower-priority tier when one has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRow {
    pub ticker: String,
    pub period_end_date: NaiveDate,
    pub tier: SourceTier,
    pub total_equity: Option<f64>,
    pub preferred_equity: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub market_cap: Option<f64>,
}

impl FundamentalRow {
    /// An empty report for `period_end_date`; fill the measures with struct update syntax.
    pub fn empty(ticker: impl Into<String>, period_end_date: NaiveDate, tier: SourceTier) -> Self {
        Self {
            ticker: ticker.into(),
            period_end_date,
            tier,
            total_equity: None,
            preferred_equity: None,
            shares_outstanding: None,
            total_debt: None,
            cash_and_equivalents: None,
            market_cap: None,
        }
    }

    /// True when the report carries at least one measure.
    pub fn has_any_measure(&self) -> bool {
        self.total_equity.is_some()
            || self.preferred_equity.is_some()
            || self.shares_outstanding.is_some()
            || self.total_debt.is_some()
            || self.cash_and_equivalents.is_some()
            || self.market_cap.is_some()
    }
}

/// The raw reports of a single tier, as one provider call returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct TierBatch {
    pub tier: SourceTier,
    pub rows: Vec<RawFundamentalRow>,
}
