//! Trailing high: highest close over the last `window` trading rows.
//!
//! Unlike the SMA, the trailing high is defined from the first row: early
//! rows use whatever history exists (a young listing's 52-week high is the
//! highest close since listing). Lookback: 0.

use std::collections::VecDeque;

use super::Indicator;
use crate::domain::AlignedRow;

#[derive(Debug, Clone)]
pub struct RollingHigh {
    window: usize,
    name: String,
}

impl RollingHigh {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "RollingHigh window must be >= 1");
        Self {
            window,
            name: format!("high_{window}"),
        }
    }
}

impl Indicator for RollingHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, rows: &[AlignedRow]) -> Vec<Option<f64>> {
        // Indices of candidate maxima, closes strictly decreasing front to back.
        let mut candidates: VecDeque<usize> = VecDeque::with_capacity(self.window);
        let mut result = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            while candidates
                .back()
                .is_some_and(|&j| rows[j].close <= row.close)
            {
                candidates.pop_back();
            }
            candidates.push_back(i);

            while candidates
                .front()
                .is_some_and(|&j| j + self.window <= i)
            {
                candidates.pop_front();
            }

            result.push(candidates.front().map(|&j| rows[j].close));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_rows;

    #[test]
    fn defined_from_first_row() {
        let rows = make_rows(&[5.0, 3.0, 4.0]);
        let result = RollingHigh::new(252).compute(&rows);
        assert_eq!(result, vec![Some(5.0), Some(5.0), Some(5.0)]);
    }

    #[test]
    fn old_high_leaves_window() {
        let rows = make_rows(&[10.0, 3.0, 4.0, 2.0, 1.0]);
        let result = RollingHigh::new(3).compute(&rows);
        assert_eq!(
            result,
            vec![Some(10.0), Some(10.0), Some(10.0), Some(4.0), Some(4.0)]
        );
    }

    #[test]
    fn matches_naive_window_max() {
        let closes: Vec<f64> = (0..400)
            .map(|i| 100.0 + ((i * 37) % 91) as f64 - ((i * 13) % 17) as f64)
            .collect();
        let rows = make_rows(&closes);
        let window = 252;
        let result = RollingHigh::new(window).compute(&rows);
        for i in 0..closes.len() {
            let start = (i + 1).saturating_sub(window);
            let expected = closes[start..=i].iter().cloned().fold(f64::MIN, f64::max);
            assert_eq!(result[i], Some(expected), "row {i}");
        }
    }

    #[test]
    fn empty_series() {
        assert!(RollingHigh::new(252).compute(&[]).is_empty());
    }
}
