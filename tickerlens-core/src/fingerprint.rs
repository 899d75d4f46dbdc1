//! Dataset fingerprinting.
//!
//! A BLAKE3 hash over exactly the validated inputs a ticker's analysis was
//! computed from. Two runs with the same hash produced the same derived rows.

use crate::domain::{FundamentalRow, PriceRow};

/// Hex BLAKE3 over the ticker, every price (date, close) and every
/// fundamental report (period, tier, measures) in a fixed order.
pub fn dataset_hash(ticker: &str, prices: &[PriceRow], fundamentals: &[FundamentalRow]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ticker.as_bytes());

    for row in prices {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(&row.close.to_le_bytes());
    }

    let mut reports: Vec<&FundamentalRow> = fundamentals.iter().collect();
    reports.sort_by_key(|r| (r.period_end_date, r.tier));
    for r in reports {
        hasher.update(r.period_end_date.to_string().as_bytes());
        hasher.update(r.tier.as_str().as_bytes());
        for value in [
            r.total_equity,
            r.preferred_equity,
            r.shares_outstanding,
            r.total_debt,
            r.cash_and_equivalents,
            r.market_cap,
        ] {
            match value {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceTier;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn prices() -> Vec<PriceRow> {
        vec![PriceRow::new("AAPL", day(2), 100.0), PriceRow::new("AAPL", day(3), 101.0)]
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            dataset_hash("AAPL", &prices(), &[]),
            dataset_hash("AAPL", &prices(), &[])
        );
        assert_eq!(dataset_hash("AAPL", &prices(), &[]).len(), 64);
    }

    #[test]
    fn hash_changes_with_inputs() {
        let base = dataset_hash("AAPL", &prices(), &[]);
        let mut changed = prices();
        changed[1].close = 101.5;
        assert_ne!(base, dataset_hash("AAPL", &changed, &[]));
        assert_ne!(base, dataset_hash("MSFT", &prices(), &[]));

        let report = FundamentalRow {
            total_equity: Some(1.0),
            ..FundamentalRow::empty("AAPL", day(1), SourceTier::QuarterlyBalanceSheet)
        };
        assert_ne!(base, dataset_hash("AAPL", &prices(), &[report]));
    }

    #[test]
    fn fundamental_order_does_not_matter() {
        let a = FundamentalRow {
            total_equity: Some(1.0),
            ..FundamentalRow::empty("AAPL", day(1), SourceTier::QuarterlyBalanceSheet)
        };
        let b = FundamentalRow {
            total_debt: Some(2.0),
            ..FundamentalRow::empty("AAPL", day(1), SourceTier::AnnualBalanceSheet)
        };
        assert_eq!(
            dataset_hash("AAPL", &prices(), &[a.clone(), b.clone()]),
            dataset_hash("AAPL", &prices(), &[b, a])
        );
    }
}
