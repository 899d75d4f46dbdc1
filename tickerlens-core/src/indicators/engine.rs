//! Turns aligned rows into indicator rows.

use super::ratios::{
    book_value_per_share, enterprise_value, market_cap, pct_from_high, price_to_book,
};
use super::{Indicator, RollingHigh, Sma};
use crate::domain::{AlignedRow, IndicatorRow};

/// Fast moving-average window (trading rows).
pub const SMA_FAST: usize = 50;
/// Slow moving-average window (trading rows).
pub const SMA_SLOW: usize = 200;
/// 52-week high window: 252 trading rows, not 365 calendar days.
pub const FIFTY_TWO_WEEK_WINDOW: usize = 252;

/// Computes every technical indicator and ratio for one ticker's aligned series.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    fast: Sma,
    slow: Sma,
    high: RollingHigh,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            fast: Sma::new(SMA_FAST),
            slow: Sma::new(SMA_SLOW),
            high: RollingHigh::new(FIFTY_TWO_WEEK_WINDOW),
        }
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// One `IndicatorRow` per aligned row, in order.
    pub fn compute(&self, rows: &[AlignedRow]) -> Vec<IndicatorRow> {
        let fast = self.fast.compute(rows);
        let slow = self.slow.compute(rows);
        let high = self.high.compute(rows);

        rows.iter()
            .zip(fast)
            .zip(slow)
            .zip(high)
            .map(|(((row, sma50), sma200), high)| {
                let f = &row.fundamentals;
                let bvps = book_value_per_share(f);
                let cap = market_cap(row.close, f);
                IndicatorRow {
                    sma50,
                    sma200,
                    fifty_two_week_high: high,
                    pct_from_52w_high: pct_from_high(row.close, high),
                    bvps,
                    pb_ratio: price_to_book(row.close, bvps),
                    market_cap: cap,
                    enterprise_value: enterprise_value(cap, f),
                    aligned: row.clone(),
                }
            })
            .collect()
    }
}
