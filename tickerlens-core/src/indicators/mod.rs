//! Indicator engine: rolling technicals and row-local fundamental ratios.
//!
//! Technical indicators implement [`Indicator`]: aligned history in, one
//! optional value per row out. A value is `None` until the indicator has
//! enough history; it is never a partial result or a zero placeholder.
//! Ratios in [`ratios`] look at one row at a time and propagate missing
//! operands as `None`.

pub mod engine;
pub mod ratios;
pub mod rolling_high;
pub mod sma;

pub use engine::{IndicatorEngine, FIFTY_TWO_WEEK_WINDOW, SMA_FAST, SMA_SLOW};
pub use rolling_high::RollingHigh;
pub use sma::Sma;

use crate::domain::AlignedRow;

/// A rolling indicator over the close series.
///
/// # Look-ahead guard
/// The value at row t may only depend on rows 0..=t. Every implementation
/// must give the same prefix whether computed on a truncated or full series.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50").
    fn name(&self) -> &str;

    /// Rows needed before the first defined value, minus one.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the whole series; output length equals input length.
    fn compute(&self, rows: &[AlignedRow]) -> Vec<Option<f64>>;
}

/// Aligned rows without fundamentals, one calendar day apart, for tests.
#[cfg(test)]
pub fn make_rows(closes: &[f64]) -> Vec<AlignedRow> {
    use crate::domain::CarriedFundamentals;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| AlignedRow {
            ticker: "TEST".to_string(),
            date: base_date + chrono::Duration::days(i as i64),
            close,
            fundamentals: CarriedFundamentals::default(),
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
