//! Raw data loading for one ticker.
//!
//! Prices follow this fallback policy:
//! 1. If a provider is configured and available, fetch from it
//! 2. If that fails or returns zero rows, read the Parquet cache
//! 3. Otherwise the ticker is unrecoverable (`LoadError::NoPriceData`)
//!
//! Fundamentals are fetched tier by tier in priority order. A tier that
//! fails is logged and skipped; the aligner then fills from lower tiers or
//! leaves fundamentals null. Fundamentals never make a ticker unrecoverable.

use chrono::NaiveDate;
use thiserror::Error;
use tickerlens_core::data::{DataProvider, DataSource, PriceCache};
use tickerlens_core::domain::{RawPriceRow, SourceTier};
use tickerlens_core::TickerInput;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no price data for '{ticker}': {reason}")]
    NoPriceData { ticker: String, reason: String },
}

/// Options controlling how data is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First date of price history to request.
    pub start: NaiveDate,
    /// Last date of price history to request.
    pub end: NaiveDate,
}

/// Raw inputs for one ticker, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedTicker {
    pub input: TickerInput,
    /// Where the prices came from.
    pub source: DataSource,
    /// Human-readable notes on anything that degraded the load.
    pub issues: Vec<String>,
}

/// Load raw prices and fundamentals for `ticker`.
///
/// `provider` is `None` when running offline; the cache is then the only source.
pub fn load_ticker(
    ticker: &str,
    provider: Option<&dyn DataProvider>,
    cache: &PriceCache,
    opts: &LoadOptions,
) -> Result<LoadedTicker, LoadError> {
    let mut issues = Vec::new();
    let mut input = TickerInput::new(ticker);

    let fetched = match provider {
        Some(p) if p.is_available() => match p.fetch_prices(ticker, opts.start, opts.end) {
            Ok(fetch) if !fetch.rows.is_empty() => {
                debug!(ticker, provider = p.name(), rows = fetch.rows.len(), "fetched prices");
                Some((fetch.rows, fetch.source))
            }
            Ok(_) => {
                warn!(ticker, provider = p.name(), "provider returned no price rows; trying cache");
                issues.push(format!("{} returned no price rows", p.name()));
                None
            }
            Err(e) => {
                warn!(ticker, provider = p.name(), error = %e, "price fetch failed; trying cache");
                issues.push(format!("price fetch failed: {e}"));
                None
            }
        },
        Some(p) => {
            warn!(ticker, provider = p.name(), "provider unavailable; trying cache");
            issues.push(format!("{} unavailable", p.name()));
            None
        }
        None => None,
    };

    let (prices, source) = match fetched {
        Some(found) => found,
        None => match cache.load(ticker) {
            Ok(loaded) => {
                for path in &loaded.quarantined {
                    warn!(ticker, path = %path.display(), "quarantined corrupt cache partition");
                    issues.push(format!("quarantined {}", path.display()));
                }
                let rows: Vec<RawPriceRow> = loaded.rows.iter().map(RawPriceRow::from).collect();
                debug!(ticker, rows = rows.len(), "loaded prices from cache");
                (rows, DataSource::Cache)
            }
            Err(e) => {
                return Err(LoadError::NoPriceData {
                    ticker: ticker.to_string(),
                    reason: match provider {
                        Some(_) => format!("provider gave nothing and {e}"),
                        None => format!("offline and {e}"),
                    },
                });
            }
        },
    };
    input.prices = prices;

    match provider {
        Some(p) if p.is_available() => {
            for tier in SourceTier::PRIORITY {
                match p.fetch_fundamentals(ticker, tier) {
                    Ok(batch) => {
                        debug!(ticker, %tier, reports = batch.rows.len(), "fetched fundamentals");
                        input.fundamentals.push(batch);
                    }
                    Err(e) => {
                        warn!(ticker, %tier, error = %e, "fundamentals tier unavailable; degrading");
                        issues.push(e.to_string());
                    }
                }
            }
        }
        _ => issues.push("fundamentals not fetched (no provider available)".into()),
    }

    Ok(LoadedTicker {
        input,
        source,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickerlens_core::data::{DataError, PriceFetch, SyntheticProvider};
    use tickerlens_core::domain::{PriceRow, TierBatch};

    fn opts() -> LoadOptions {
        LoadOptions {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        }
    }

    /// Provider that fails every price fetch.
    struct FailingProvider;

    impl DataProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn source(&self) -> DataSource {
            DataSource::Yahoo
        }
        fn fetch_prices(
            &self,
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceFetch, DataError> {
            Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
        }
        fn fetch_fundamentals(
            &self,
            _ticker: &str,
            tier: SourceTier,
        ) -> Result<TierBatch, DataError> {
            Err(DataError::unavailable(tier, "down"))
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn cached_rows() -> Vec<PriceRow> {
        vec![
            PriceRow::new("AAPL", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 185.6),
            PriceRow::new("AAPL", NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 184.2),
        ]
    }

    #[test]
    fn provider_rows_win() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        let provider = SyntheticProvider::new();

        let loaded = load_ticker("AAPL", Some(&provider), &cache, &opts()).unwrap();
        assert_eq!(loaded.source, DataSource::Synthetic);
        assert!(!loaded.input.prices.is_empty());
        assert_eq!(loaded.input.fundamentals.len(), 1);
        // annual and snapshot tiers degrade
        assert_eq!(loaded.issues.len(), 2);
    }

    #[test]
    fn failed_fetch_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.write("AAPL", &cached_rows(), "yahoo").unwrap();

        let loaded = load_ticker("AAPL", Some(&FailingProvider), &cache, &opts()).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.input.prices.len(), 2);
        assert!(loaded.input.fundamentals.is_empty());
        assert!(loaded.issues.iter().any(|i| i.contains("price fetch failed")));
    }

    #[test]
    fn offline_reads_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache.write("AAPL", &cached_rows(), "yahoo").unwrap();

        let loaded = load_ticker("AAPL", None, &cache, &opts()).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.input.prices[0].close, Some(185.6));
    }

    #[test]
    fn nothing_anywhere_is_no_price_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        let err = load_ticker("ZZZZ", Some(&FailingProvider), &cache, &opts()).unwrap_err();
        assert!(matches!(err, LoadError::NoPriceData { .. }));
        assert!(err.to_string().contains("ZZZZ"));

        let err = load_ticker("ZZZZ", None, &cache, &opts()).unwrap_err();
        assert!(err.to_string().contains("offline"));
    }
}
