//! SQLite persistence for derived metrics and signal events.
//!
//! Writes are idempotent: metrics upsert on `(ticker, date)` and signal
//! events are ignored when `(ticker, date, type)` already exists, so
//! persisting the same analysis twice leaves row counts and values unchanged.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::warn;
use tickerlens_core::TickerAnalysis;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tickers (
        ticker TEXT PRIMARY KEY,
        name   TEXT
    );
    CREATE TABLE IF NOT EXISTS daily_metrics (
        ticker TEXT NOT NULL,
        date   TEXT NOT NULL,
        close  REAL,
        SMA50  REAL,
        SMA200 REAL,
        PRIMARY KEY (ticker, date)
    );
    CREATE TABLE IF NOT EXISTS signal_events (
        id     INTEGER PRIMARY KEY AUTOINCREMENT,
        ticker TEXT NOT NULL,
        date   TEXT NOT NULL,
        type   TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_signal_events_natural
        ON signal_events (ticker, date, type);
";

/// What one save touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveSummary {
    pub metrics_written: usize,
    pub signals_inserted: usize,
}

/// SQLite-backed metrics store.
pub struct MetricsStore {
    conn: Connection,
}

impl MetricsStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        for (pragma, value) in [("journal_mode", "WAL"), ("synchronous", "NORMAL")] {
            if let Err(e) = conn.pragma_update(None, pragma, value) {
                warn!(pragma, value, error = %e, "failed to set pragma; using sqlite default");
            }
        }
        Self::with_connection(conn)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Persist one ticker's analysis in a single transaction.
    pub fn save_analysis(&mut self, analysis: &TickerAnalysis) -> Result<SaveSummary, StoreError> {
        let tx = self.conn.transaction()?;
        let mut summary = SaveSummary::default();

        tx.execute(
            "INSERT INTO tickers (ticker, name) VALUES (?1, NULL)
             ON CONFLICT(ticker) DO NOTHING",
            params![analysis.ticker],
        )?;

        {
            let mut metric = tx.prepare_cached(
                "INSERT INTO daily_metrics (ticker, date, close, SMA50, SMA200)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(ticker, date) DO UPDATE SET
                    close = excluded.close,
                    SMA50 = excluded.SMA50,
                    SMA200 = excluded.SMA200",
            )?;
            for row in &analysis.rows {
                summary.metrics_written += metric.execute(params![
                    analysis.ticker,
                    row.date().to_string(),
                    row.close(),
                    row.sma50,
                    row.sma200,
                ])?;
            }

            let mut signal = tx.prepare_cached(
                "INSERT OR IGNORE INTO signal_events (ticker, date, type) VALUES (?1, ?2, ?3)",
            )?;
            for event in &analysis.signals {
                summary.signals_inserted += signal.execute(params![
                    event.ticker,
                    event.date.to_string(),
                    event.kind.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    pub fn metric_count(&self, ticker: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_metrics WHERE ticker = ?1",
            params![ticker],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    pub fn signal_count(&self, ticker: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM signal_events WHERE ticker = ?1",
            params![ticker],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Stored `(close, SMA50, SMA200)` for one date, if any.
    pub fn metric_on(
        &self,
        ticker: &str,
        date: &str,
    ) -> Result<Option<(f64, Option<f64>, Option<f64>)>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT close, SMA50, SMA200 FROM daily_metrics WHERE ticker = ?1 AND date = ?2",
                params![ticker, date],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Stored signal events for a ticker as `(date, type)`, oldest first.
    pub fn signals(&self, ticker: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, type FROM signal_events WHERE ticker = ?1 ORDER BY date ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![ticker], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn has_ticker(&self, ticker: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT ticker FROM tickers WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tickerlens_core::domain::RawPriceRow;
    use tickerlens_core::{process_ticker, TickerInput};

    fn analysis(n: usize) -> TickerAnalysis {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let prices = (0..n)
            .map(|i| {
                // down, then up: one golden cross once both averages exist
                let close = if i < 300 {
                    300.0 - i as f64 * 0.5
                } else {
                    150.0 + (i - 300) as f64
                };
                RawPriceRow {
                    ticker: Some("AAPL".into()),
                    date: Some((base + chrono::Duration::days(i as i64)).to_string()),
                    close: Some(close),
                    ..Default::default()
                }
            })
            .collect();
        process_ticker(&TickerInput {
            prices,
            ..TickerInput::new("AAPL")
        })
        .unwrap()
    }

    #[test]
    fn saves_metrics_and_signals() {
        let mut store = MetricsStore::open_in_memory().unwrap();
        let a = analysis(400);
        assert_eq!(a.golden_crosses().len(), 1);

        let summary = store.save_analysis(&a).unwrap();
        assert_eq!(summary.metrics_written, 400);
        assert_eq!(summary.signals_inserted, 1);
        assert!(store.has_ticker("AAPL").unwrap());
        assert_eq!(store.metric_count("AAPL").unwrap(), 400);
        assert_eq!(
            store.signals("AAPL").unwrap(),
            vec![(a.golden_crosses()[0].to_string(), "GoldenCross".to_string())]
        );
    }

    #[test]
    fn saving_twice_is_idempotent() {
        let mut store = MetricsStore::open_in_memory().unwrap();
        let a = analysis(400);

        store.save_analysis(&a).unwrap();
        let before = (
            store.metric_count("AAPL").unwrap(),
            store.signal_count("AAPL").unwrap(),
            store.metric_on("AAPL", "2020-12-31").unwrap(),
        );

        let second = store.save_analysis(&a).unwrap();
        assert_eq!(second.signals_inserted, 0);
        let after = (
            store.metric_count("AAPL").unwrap(),
            store.signal_count("AAPL").unwrap(),
            store.metric_on("AAPL", "2020-12-31").unwrap(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn nulls_are_stored_as_null() {
        let mut store = MetricsStore::open_in_memory().unwrap();
        store.save_analysis(&analysis(10)).unwrap();
        let (close, sma50, sma200) = store.metric_on("AAPL", "2020-01-01").unwrap().unwrap();
        assert_eq!(close, 300.0);
        assert_eq!(sma50, None);
        assert_eq!(sma200, None);
    }

    #[test]
    fn empty_analysis_registers_ticker_only() {
        let mut store = MetricsStore::open_in_memory().unwrap();
        let empty = process_ticker(&TickerInput::new("NONE")).unwrap();
        let summary = store.save_analysis(&empty).unwrap();
        assert_eq!(summary, SaveSummary::default());
        assert!(store.has_ticker("NONE").unwrap());
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.db");
        {
            let mut store = MetricsStore::open(&path).unwrap();
            store.save_analysis(&analysis(50)).unwrap();
        }
        let store = MetricsStore::open(&path).unwrap();
        assert_eq!(store.metric_count("AAPL").unwrap(), 50);
    }

    #[test]
    fn file_database_uses_wal_journal() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::open(&dir.path().join("metrics.db")).unwrap();
        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
