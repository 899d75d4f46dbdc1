//! Daily/quarterly series alignment.
//!
//! Merges one ascending daily price series with any number of fundamental
//! reports (across source tiers) onto the daily index. Each tier keeps a
//! cursor that only ever moves forward with the trading date, so a value
//! carried into a row never comes from a period ending after that row's date.
//!
//! Resolution on a date: take each tier's latest report as of the date,
//! order them by period end (newest first) then tier priority, and let every
//! measure take the first non-null value in that order.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{AlignedRow, CarriedFundamentals, FundamentalRow, PriceRow, SourceTier};

/// The ticker has no usable price history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no usable price history for '{ticker}'")]
pub struct EmptySeriesError {
    pub ticker: String,
}

/// Alignment failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error(transparent)]
    EmptySeries(#[from] EmptySeriesError),

    /// Validated prices must be strictly increasing; anything else is an upstream contract violation.
    #[error("price dates not strictly increasing for '{ticker}': {date} follows {previous}")]
    NonIncreasingDates {
        ticker: String,
        date: NaiveDate,
        previous: NaiveDate,
    },
}

/// Align `prices` with `fundamentals` (rows from any mix of tiers).
///
/// Returns one `AlignedRow` per price row, in the same order.
pub fn align_series(
    ticker: &str,
    prices: &[PriceRow],
    fundamentals: &[FundamentalRow],
) -> Result<Vec<AlignedRow>, AlignError> {
    if prices.is_empty() {
        return Err(EmptySeriesError {
            ticker: ticker.to_string(),
        }
        .into());
    }
    for pair in prices.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(AlignError::NonIncreasingDates {
                ticker: ticker.to_string(),
                date: pair[1].date,
                previous: pair[0].date,
            });
        }
    }

    let mut state = CarryState::new(fundamentals);
    let mut carried = CarriedFundamentals::default();

    let aligned = prices
        .iter()
        .map(|price| {
            if state.advance_to(price.date) {
                carried = state.resolve();
            }
            AlignedRow {
                ticker: price.ticker.clone(),
                date: price.date,
                close: price.close,
                fundamentals: carried.clone(),
            }
        })
        .collect();

    Ok(aligned)
}

/// Last-known report per tier, advanced monotonically by date.
struct CarryState<'a> {
    cursors: Vec<TierCursor<'a>>,
}

struct TierCursor<'a> {
    rows: Vec<&'a FundamentalRow>,
    next: usize,
    current: Option<&'a FundamentalRow>,
}

impl<'a> TierCursor<'a> {
    /// Move past every report with a period end on or before `date`. Returns true if anything moved.
    fn advance_to(&mut self, date: NaiveDate) -> bool {
        let mut moved = false;
        while let Some(row) = self.rows.get(self.next) {
            if row.period_end_date > date {
                break;
            }
            self.current = Some(row);
            self.next += 1;
            moved = true;
        }
        moved
    }
}

impl<'a> CarryState<'a> {
    fn new(fundamentals: &'a [FundamentalRow]) -> Self {
        let mut by_tier: BTreeMap<SourceTier, Vec<&'a FundamentalRow>> = BTreeMap::new();
        for row in fundamentals {
            by_tier.entry(row.tier).or_default().push(row);
        }
        let cursors = by_tier
            .into_values()
            .map(|mut rows| {
                rows.sort_by_key(|r| r.period_end_date);
                TierCursor {
                    rows,
                    next: 0,
                    current: None,
                }
            })
            .collect();
        Self { cursors }
    }

    fn advance_to(&mut self, date: NaiveDate) -> bool {
        let mut moved = false;
        for cursor in &mut self.cursors {
            moved |= cursor.advance_to(date);
        }
        moved
    }

    /// Combine the current report of every tier into the values in effect.
    fn resolve(&self) -> CarriedFundamentals {
        let mut candidates: Vec<&FundamentalRow> =
            self.cursors.iter().filter_map(|c| c.current).collect();
        if candidates.is_empty() {
            return CarriedFundamentals::default();
        }
        candidates.sort_by(|a, b| {
            b.period_end_date
                .cmp(&a.period_end_date)
                .then(a.tier.cmp(&b.tier))
        });

        let first = |pick: fn(&FundamentalRow) -> Option<f64>| {
            candidates.iter().find_map(|row| pick(row))
        };

        let anchor = candidates
            .iter()
            .find(|row| row.total_equity.is_some())
            .unwrap_or(&candidates[0]);

        CarriedFundamentals {
            as_of: Some(anchor.period_end_date),
            tier: Some(anchor.tier),
            total_equity: first(|r| r.total_equity),
            preferred_equity: first(|r| r.preferred_equity),
            shares_outstanding: first(|r| r.shares_outstanding),
            total_debt: first(|r| r.total_debt),
            cash_and_equivalents: first(|r| r.cash_and_equivalents),
            market_cap: first(|r| r.market_cap),
        }
    }
}
