//! Yahoo Finance data provider.
//!
//! Prices come from the v8 chart API. Fundamentals come from the v10
//! quoteSummary API, one module set per tier:
//! - quarterly: `balanceSheetHistoryQuarterly`
//! - annual: `balanceSheetHistory`
//! - snapshot: `defaultKeyStatistics` + `financialData` + `price`
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV import path is the fallback when Yahoo is unavailable.

use super::provider::{DataError, DataProvider, DataSource, PriceFetch};
use crate::domain::{RawFundamentalRow, RawPriceRow, SourceTier, TierBatch};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

// ── chart API ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

// ── quoteSummary API ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SummaryModules {
    balance_sheet_history_quarterly: Option<BalanceSheetHistory>,
    balance_sheet_history: Option<BalanceSheetHistory>,
    default_key_statistics: Option<KeyStatistics>,
    financial_data: Option<FinancialData>,
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BalanceSheetHistory {
    balance_sheet_statements: Vec<BalanceSheet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BalanceSheet {
    end_date: Option<Value>,
    total_stockholder_equity: Option<Value>,
    preferred_stock: Option<Value>,
    short_long_term_debt: Option<Value>,
    long_term_debt: Option<Value>,
    cash: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct KeyStatistics {
    shares_outstanding: Option<Value>,
    book_value: Option<Value>,
    most_recent_quarter: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FinancialData {
    total_cash: Option<Value>,
    total_debt: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<Value>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; empty objects mean "not reported".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Value {
    raw: Option<f64>,
}

fn raw(v: &Option<Value>) -> Option<f64> {
    v.as_ref().and_then(|v| v.raw)
}

fn date_from_ts(ts: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive().to_string())
}

fn modules_for(tier: SourceTier) -> &'static str {
    match tier {
        SourceTier::QuarterlyBalanceSheet => "balanceSheetHistoryQuarterly",
        SourceTier::AnnualBalanceSheet => "balanceSheetHistory",
        SourceTier::SummarySnapshot => "defaultKeyStatistics,financialData,price",
    }
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Build the chart API URL for a ticker and date range.
    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{BASE_URL}/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    fn summary_url(ticker: &str, tier: SourceTier) -> String {
        format!(
            "{BASE_URL}/v10/finance/quoteSummary/{ticker}?modules={}",
            modules_for(tier)
        )
    }

    /// GET a JSON document with retry and exponential backoff.
    fn get_json<T: DeserializeOwned>(&self, url: &str, ticker: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: ticker.to_string(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        last_error = Some(DataError::NetworkUnreachable(format!(
                            "HTTP {status} for {ticker}"
                        )));
                        continue;
                    }

                    return resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {ticker}: {e}"
                        ))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }
}

/// Turn a chart response into raw price rows.
///
/// Timestamps with every quote field null (holidays, halted days) are
/// skipped; anything else is passed through for the validator to judge.
fn parse_chart(ticker: &str, resp: ChartResponse) -> Result<Vec<RawPriceRow>, DataError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
        }
        (None, Some(err)) => {
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )))
        }
        (None, None) => {
            return Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            ))
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        // listed but no trading history in range
        return Ok(Vec::new());
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
        {
            continue;
        }

        rows.push(RawPriceRow {
            ticker: Some(ticker.to_string()),
            date: date_from_ts(ts),
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(rows)
}

fn balance_sheet_row(ticker: &str, sheet: &BalanceSheet) -> RawFundamentalRow {
    let short = raw(&sheet.short_long_term_debt);
    let long = raw(&sheet.long_term_debt);
    let total_debt = match (short, long) {
        (None, None) => None,
        (s, l) => Some(s.unwrap_or(0.0) + l.unwrap_or(0.0)),
    };
    RawFundamentalRow {
        ticker: Some(ticker.to_string()),
        period_end_date: sheet
            .end_date
            .as_ref()
            .and_then(|v| v.raw)
            .and_then(|ts| date_from_ts(ts as i64)),
        total_equity: raw(&sheet.total_stockholder_equity),
        preferred_equity: raw(&sheet.preferred_stock),
        shares_outstanding: None,
        total_debt,
        cash_and_equivalents: raw(&sheet.cash),
        market_cap: None,
    }
}

/// Turn a quoteSummary response into one tier's raw reports.
fn parse_summary(
    ticker: &str,
    tier: SourceTier,
    resp: SummaryResponse,
) -> Result<TierBatch, DataError> {
    let modules = match (resp.quote_summary.result, resp.quote_summary.error) {
        (Some(result), _) => result.into_iter().next().unwrap_or_default(),
        (None, Some(err)) => {
            return Err(DataError::unavailable(
                tier,
                format!("{}: {}", err.code, err.description),
            ))
        }
        (None, None) => return Err(DataError::unavailable(tier, "empty result with no error")),
    };

    let rows = match tier {
        SourceTier::QuarterlyBalanceSheet | SourceTier::AnnualBalanceSheet => {
            let history = if tier == SourceTier::QuarterlyBalanceSheet {
                modules.balance_sheet_history_quarterly
            } else {
                modules.balance_sheet_history
            };
            let history =
                history.ok_or_else(|| DataError::unavailable(tier, "module missing from response"))?;
            history
                .balance_sheet_statements
                .iter()
                .map(|sheet| balance_sheet_row(ticker, sheet))
                .collect()
        }
        SourceTier::SummarySnapshot => {
            let stats = modules.default_key_statistics.unwrap_or_default();
            let financial = modules.financial_data.unwrap_or_default();
            let price = modules.price.unwrap_or_default();

            let shares = raw(&stats.shares_outstanding);
            let equity = match (raw(&stats.book_value), shares) {
                (Some(bvps), Some(shares)) => Some(bvps * shares),
                _ => None,
            };
            let period = raw(&stats.most_recent_quarter)
                .and_then(|ts| date_from_ts(ts as i64))
                .ok_or_else(|| DataError::unavailable(tier, "no mostRecentQuarter in snapshot"))?;

            vec![RawFundamentalRow {
                ticker: Some(ticker.to_string()),
                period_end_date: Some(period),
                total_equity: equity,
                preferred_equity: None,
                shares_outstanding: shares,
                total_debt: raw(&financial.total_debt),
                cash_and_equivalents: raw(&financial.total_cash),
                market_cap: raw(&price.market_cap),
            }]
        }
    };

    Ok(TierBatch { tier, rows })
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::Yahoo
    }

    fn fetch_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceFetch, DataError> {
        let url = Self::chart_url(ticker, start, end);
        let chart: ChartResponse = self.get_json(&url, ticker)?;
        Ok(PriceFetch {
            ticker: ticker.to_string(),
            rows: parse_chart(ticker, chart)?,
            source: DataSource::Yahoo,
        })
    }

    fn fetch_fundamentals(&self, ticker: &str, tier: SourceTier) -> Result<TierBatch, DataError> {
        let url = Self::summary_url(ticker, tier);
        let summary: SummaryResponse = self
            .get_json(&url, ticker)
            .map_err(|e| DataError::unavailable(tier, e))?;
        parse_summary(ticker, tier, summary)
    }

    fn is_available(&self) -> bool {
        true
    }
}
