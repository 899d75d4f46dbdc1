//! Moving-average crossover detection: golden cross and death cross.
//!
//! Compares each pair of consecutive rows where the fast and slow averages
//! are defined on both rows. A pair with a missing value on either side is
//! skipped outright; the scan resumes at the next fully defined pair using
//! the absolute values on that pair, never a remembered "above/below" flag
//! from before the gap.

use chrono::NaiveDate;

use crate::domain::{IndicatorRow, SignalEvent, SignalKind};

/// Fast and slow average values on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossPoint {
    pub date: NaiveDate,
    pub fast: Option<f64>,
    pub slow: Option<f64>,
}

impl CrossPoint {
    fn values(&self) -> Option<(f64, f64)> {
        Some((self.fast?, self.slow?))
    }
}

/// Classify the transition from `prev` to `cur`, each `(fast, slow)`.
///
/// Golden: fast ≤ slow before and fast > slow now.
/// Death: fast ≥ slow before and fast < slow now.
/// Equal values now never fire.
pub fn classify(prev: (f64, f64), cur: (f64, f64)) -> Option<SignalKind> {
    let (fast_prev, slow_prev) = prev;
    let (fast_cur, slow_cur) = cur;

    if fast_cur > slow_cur && fast_prev <= slow_prev {
        return Some(SignalKind::GoldenCross);
    }
    if fast_cur < slow_cur && fast_prev >= slow_prev {
        return Some(SignalKind::DeathCross);
    }
    None
}

/// Every crossover in `points`, in date order.
pub fn scan(points: &[CrossPoint]) -> Vec<(NaiveDate, SignalKind)> {
    points
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].values()?;
            let cur = pair[1].values()?;
            classify(prev, cur).map(|kind| (pair[1].date, kind))
        })
        .collect()
}

/// Every SMA50/SMA200 crossover for one ticker's indicator rows.
pub fn detect_crossovers(ticker: &str, rows: &[IndicatorRow]) -> Vec<SignalEvent> {
    let points: Vec<CrossPoint> = rows
        .iter()
        .map(|row| CrossPoint {
            date: row.date(),
            fast: row.sma50,
            slow: row.sma200,
        })
        .collect();

    scan(&points)
        .into_iter()
        .map(|(date, kind)| SignalEvent {
            ticker: ticker.to_string(),
            date,
            kind,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<CrossPoint> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        fast.iter()
            .zip(slow)
            .enumerate()
            .map(|(i, (&fast, &slow))| CrossPoint {
                date: base + chrono::Duration::days(i as i64),
                fast,
                slow,
            })
            .collect()
    }

    fn all(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn golden_cross_at_flip() {
        let pts = points(&all(&[49.0, 50.0, 51.0, 52.0]), &all(&[52.0, 51.0, 50.0, 49.0]));
        let events = scan(&pts);
        assert_eq!(events, vec![(pts[2].date, SignalKind::GoldenCross)]);
    }

    #[test]
    fn death_cross_at_flip() {
        let pts = points(&all(&[52.0, 51.0, 50.0, 49.0]), &all(&[49.0, 50.0, 51.0, 52.0]));
        let events = scan(&pts);
        assert_eq!(events, vec![(pts[2].date, SignalKind::DeathCross)]);
    }

    #[test]
    fn touching_then_crossing_fires_once() {
        // equal on row 1, above on row 2
        let pts = points(&all(&[9.0, 10.0, 11.0]), &all(&[10.0, 10.0, 10.0]));
        assert_eq!(scan(&pts), vec![(pts[2].date, SignalKind::GoldenCross)]);
    }

    #[test]
    fn equal_values_never_fire() {
        let pts = points(&all(&[10.0, 10.0, 10.0]), &all(&[10.0, 10.0, 10.0]));
        assert!(scan(&pts).is_empty());

        // crossing into equality is not an event either
        let pts = points(&all(&[9.0, 10.0]), &all(&[10.0, 10.0]));
        assert!(scan(&pts).is_empty());
    }

    #[test]
    fn trend_continuation_is_silent() {
        let pts = points(&all(&[105.0; 5]), &all(&[100.0; 5]));
        assert!(scan(&pts).is_empty());
    }

    #[test]
    fn gap_is_not_bridged() {
        // below before the gap, above after: no event across the gap itself
        let fast = vec![Some(90.0), None, Some(110.0), Some(111.0)];
        let slow = vec![Some(100.0), Some(100.0), Some(100.0), Some(100.0)];
        let pts = points(&fast, &slow);
        assert!(scan(&pts).is_empty());
    }

    #[test]
    fn resumes_after_gap_with_fresh_comparison() {
        let fast = vec![Some(90.0), None, Some(95.0), Some(105.0)];
        let slow = vec![Some(100.0), Some(100.0), Some(100.0), Some(100.0)];
        let pts = points(&fast, &slow);
        assert_eq!(scan(&pts), vec![(pts[3].date, SignalKind::GoldenCross)]);
    }

    #[test]
    fn warmup_rows_are_skipped() {
        let fast = vec![None, None, Some(1.0), Some(3.0), Some(1.0)];
        let slow = vec![None, None, Some(2.0), Some(2.0), Some(2.0)];
        let pts = points(&fast, &slow);
        assert_eq!(
            scan(&pts),
            vec![
                (pts[3].date, SignalKind::GoldenCross),
                (pts[4].date, SignalKind::DeathCross),
            ]
        );
    }

    #[test]
    fn empty_and_single_point() {
        assert!(scan(&[]).is_empty());
        assert!(scan(&points(&all(&[1.0]), &all(&[2.0]))).is_empty());
    }
}
