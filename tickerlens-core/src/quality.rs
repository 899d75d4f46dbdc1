//! Completeness grade of a ticker's latest derived row.
//!
//! Informational only: a poor grade never blocks persistence or export.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::IndicatorRow;

/// Coarse completeness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    /// Every required field is populated.
    Complete,
    /// Some required fields are populated.
    Partial,
    /// No required field is populated, or there is no row at all.
    Missing,
}

impl QualityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Complete => "complete",
            QualityGrade::Partial => "partial",
            QualityGrade::Missing => "missing",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the fields the grade looks at, in report order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "SMA50",
    "SMA200",
    "bvps",
    "pb_ratio",
    "enterprise_value",
    "52w_high",
];

fn required_values(row: &IndicatorRow) -> [Option<f64>; 6] {
    [
        row.sma50,
        row.sma200,
        row.bvps,
        row.pb_ratio,
        row.enterprise_value,
        row.fifty_two_week_high,
    ]
}

/// Grade a single row.
pub fn grade_row(row: &IndicatorRow) -> QualityGrade {
    let values = required_values(row);
    let populated = values.iter().filter(|v| v.is_some()).count();
    if populated == values.len() {
        QualityGrade::Complete
    } else if populated == 0 {
        QualityGrade::Missing
    } else {
        QualityGrade::Partial
    }
}

/// Grade a series by its most recent row; an empty series is `Missing`.
pub fn assess(rows: &[IndicatorRow]) -> QualityGrade {
    rows.last().map_or(QualityGrade::Missing, grade_row)
}

/// Required fields that are null on `row`.
pub fn missing_fields(row: &IndicatorRow) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .zip(required_values(row))
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect()
}
