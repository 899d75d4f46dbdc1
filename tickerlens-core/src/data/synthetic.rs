//! Synthetic data provider for offline development.
//!
//! Produces a weekday random walk and one balance sheet per calendar quarter,
//! seeded from the ticker name so repeated runs are identical. Results are
//! tagged [`DataSource::Synthetic`] and should never be mistaken for market data.

use super::provider::{DataError, DataProvider, DataSource, PriceFetch};
use crate::domain::{RawFundamentalRow, RawPriceRow, SourceTier, TierBatch};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random-walk generator.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    start_price: f64,
    shares_outstanding: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            shares_outstanding: 1_000_000_000.0,
        }
    }
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// RNG seeded from the ticker plus a stream label.
    fn rng(ticker: &str, stream: &str) -> StdRng {
        let seed = blake3::hash(format!("{ticker}/{stream}").as_bytes());
        StdRng::from_seed(*seed.as_bytes())
    }

    /// Quarter ends (Mar 31, Jun 30, Sep 30, Dec 31) up to `today`, starting
    /// two years before it.
    fn quarter_ends(today: NaiveDate) -> Vec<NaiveDate> {
        let mut ends = Vec::new();
        for year in (today.year() - 2)..=today.year() {
            for (month, day) in [(3, 31), (6, 30), (9, 30), (12, 31)] {
                if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
                    if d <= today {
                        ends.push(d);
                    }
                }
            }
        }
        ends
    }
}

/// Generate weekday prices over `[start, end]`.
pub fn generate_prices(ticker: &str, start: NaiveDate, end: NaiveDate, start_price: f64) -> Vec<RawPriceRow> {
    let mut rng = SyntheticProvider::rng(ticker, "prices");
    let mut rows = Vec::new();
    let mut price = start_price;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.02..0.021);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        rows.push(RawPriceRow {
            ticker: Some(ticker.to_string()),
            date: Some(current.to_string()),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    rows
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceFetch, DataError> {
        Ok(PriceFetch {
            ticker: ticker.to_string(),
            rows: generate_prices(ticker, start, end, self.start_price),
            source: DataSource::Synthetic,
        })
    }

    /// Quarterly sheets only; the other tiers report unavailable so the
    /// degradation path gets exercised offline too.
    fn fetch_fundamentals(&self, ticker: &str, tier: SourceTier) -> Result<TierBatch, DataError> {
        if tier != SourceTier::QuarterlyBalanceSheet {
            return Err(DataError::unavailable(tier, "synthetic provider has no such tier"));
        }

        let mut rng = Self::rng(ticker, tier.as_str());
        let today = chrono::Local::now().date_naive();
        let rows = Self::quarter_ends(today)
            .into_iter()
            .map(|period| {
                let equity = self.shares_outstanding * rng.gen_range(5.0..25.0);
                RawFundamentalRow {
                    ticker: Some(ticker.to_string()),
                    period_end_date: Some(period.to_string()),
                    total_equity: Some(equity),
                    preferred_equity: None,
                    shares_outstanding: Some(self.shares_outstanding),
                    total_debt: Some(equity * rng.gen_range(0.1..1.5)),
                    cash_and_equivalents: Some(equity * rng.gen_range(0.05..0.5)),
                    market_cap: None,
                }
            })
            .collect();

        Ok(TierBatch { tier, rows })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn prices_are_deterministic() {
        let (start, end) = jan();
        let a = generate_prices("SPY", start, end, 100.0);
        let b = generate_prices("SPY", start, end, 100.0);
        assert_eq!(a, b);
        // 23 weekdays in January 2024
        assert_eq!(a.len(), 23);
    }

    #[test]
    fn different_tickers_differ() {
        let (start, end) = jan();
        let spy = generate_prices("SPY", start, end, 100.0);
        let qqq = generate_prices("QQQ", start, end, 100.0);
        assert_eq!(spy.len(), qqq.len());
        assert_ne!(spy[0].close, qqq[0].close);
    }

    #[test]
    fn prices_pass_validation() {
        let (start, end) = jan();
        let rows = generate_prices("SPY", start, end, 100.0);
        let validated = crate::data::validate::validate_prices("SPY", &rows);
        assert_eq!(validated.dropped_count(), 0);
    }

    #[test]
    fn only_quarterly_tier_is_served() {
        let p = SyntheticProvider::new();
        let batch = p
            .fetch_fundamentals("SPY", SourceTier::QuarterlyBalanceSheet)
            .unwrap();
        assert!(!batch.rows.is_empty());
        assert!(batch.rows.iter().all(|r| r.shares_outstanding.is_some()));
        assert!(p
            .fetch_fundamentals("SPY", SourceTier::SummarySnapshot)
            .is_err());
    }
}
