//! Simple Moving Average (SMA).
//!
//! Mean of the last `period` closes, inclusive of the current row.
//! Lookback: period - 1 (first value at index period-1).

use super::Indicator;
use crate::domain::AlignedRow;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, rows: &[AlignedRow]) -> Vec<Option<f64>> {
        let n = rows.len();
        let mut result = vec![None; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = rows.iter().take(self.period).map(|r| r.close).sum();
        result[self.period - 1] = Some(sum / self.period as f64);

        for i in self.period..n {
            sum += rows[i].close - rows[i - self.period].close;
            result[i] = Some(sum / self.period as f64);
        }

        result
    }
}
