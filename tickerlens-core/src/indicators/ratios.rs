//! Row-local fundamental ratios.
//!
//! Each function looks at a single row and returns `None` when an operand is
//! missing or a divisor is zero. No cross-row state.

use crate::domain::CarriedFundamentals;

/// Book value per share: (total equity − preferred equity) / shares outstanding.
///
/// Preferred equity is subtracted only when reported.
pub fn book_value_per_share(f: &CarriedFundamentals) -> Option<f64> {
    let equity = f.total_equity?;
    let shares = f.shares_outstanding?;
    if shares == 0.0 {
        return None;
    }
    let common = equity - f.preferred_equity.unwrap_or(0.0);
    Some(common / shares)
}

/// Price-to-book: close / BVPS.
pub fn price_to_book(close: f64, bvps: Option<f64>) -> Option<f64> {
    match bvps {
        Some(b) if b != 0.0 => Some(close / b),
        _ => None,
    }
}

/// Market capitalisation: the reported figure when present, else close × shares outstanding.
pub fn market_cap(close: f64, f: &CarriedFundamentals) -> Option<f64> {
    f.market_cap
        .or_else(|| f.shares_outstanding.map(|shares| close * shares))
}

/// Enterprise value: market cap + total debt − cash and equivalents.
pub fn enterprise_value(market_cap: Option<f64>, f: &CarriedFundamentals) -> Option<f64> {
    Some(market_cap? + f.total_debt? - f.cash_and_equivalents?)
}

/// Percent distance of `close` from `high`; negative below the high.
pub fn pct_from_high(close: f64, high: Option<f64>) -> Option<f64> {
    match high {
        Some(h) if h != 0.0 => Some((close - h) / h * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn fundamentals() -> CarriedFundamentals {
        CarriedFundamentals {
            total_equity: Some(1_000.0),
            shares_outstanding: Some(100.0),
            total_debt: Some(500.0),
            cash_and_equivalents: Some(200.0),
            ..Default::default()
        }
    }

    #[test]
    fn bvps_basic() {
        assert_eq!(book_value_per_share(&fundamentals()), Some(10.0));
    }

    #[test]
    fn bvps_subtracts_preferred_equity() {
        let f = CarriedFundamentals {
            preferred_equity: Some(200.0),
            ..fundamentals()
        };
        assert_eq!(book_value_per_share(&f), Some(8.0));
    }

    #[test]
    fn bvps_null_on_zero_or_missing_shares() {
        let zero = CarriedFundamentals {
            shares_outstanding: Some(0.0),
            ..fundamentals()
        };
        assert_eq!(book_value_per_share(&zero), None);

        let missing = CarriedFundamentals {
            shares_outstanding: None,
            ..fundamentals()
        };
        assert_eq!(book_value_per_share(&missing), None);
    }

    #[test]
    fn bvps_null_without_equity() {
        let f = CarriedFundamentals {
            total_equity: None,
            ..fundamentals()
        };
        assert_eq!(book_value_per_share(&f), None);
    }

    #[test]
    fn pb_ratio_example() {
        let pb = price_to_book(455.2, Some(8.32)).unwrap();
        assert_approx(pb, 54.711_538_461_538_46, 1e-9);
        assert_eq!(price_to_book(455.2, Some(0.0)), None);
        assert_eq!(price_to_book(455.2, None), None);
    }

    #[test]
    fn market_cap_prefers_reported_value() {
        let reported = CarriedFundamentals {
            market_cap: Some(9_999.0),
            ..fundamentals()
        };
        assert_eq!(market_cap(50.0, &reported), Some(9_999.0));
        assert_eq!(market_cap(50.0, &fundamentals()), Some(5_000.0));
        assert_eq!(market_cap(50.0, &CarriedFundamentals::default()), None);
    }

    #[test]
    fn enterprise_value_needs_all_operands() {
        let f = fundamentals();
        assert_eq!(enterprise_value(Some(5_000.0), &f), Some(5_300.0));
        assert_eq!(enterprise_value(None, &f), None);

        let no_cash = CarriedFundamentals {
            cash_and_equivalents: None,
            ..fundamentals()
        };
        assert_eq!(enterprise_value(Some(5_000.0), &no_cash), None);
    }

    #[test]
    fn pct_from_high_example() {
        let pct = pct_from_high(455.2, Some(480.0)).unwrap();
        assert_approx(pct, -5.166_666_666_666_667, DEFAULT_EPSILON);
        assert_eq!(pct_from_high(455.2, None), None);
    }
}
